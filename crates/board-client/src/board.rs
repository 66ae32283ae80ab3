//! # Board View
//!
//! Client-side state of the board. Two structures are kept apart:
//!
//! * the **record map**, authoritative content per card, fed by full loads,
//!   HTTP responses and realtime events;
//! * the **order model**, one ordered list of card keys per column, owned by
//!   the client and only ever changed by user reordering and [`BoardView::reconcile`].
//!
//! Every change to the record map is followed by a reconcile pass, which keeps
//! each card in exactly one column without reshuffling anything it does not
//! have to touch.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use domains::{Category, ChangeEvent, Idea, IdeaId};

use crate::txn::{Resolution, TxnId, TxnLog};

/// Message count at which a thread's progress bar is full.
pub const FULL_THREAD: i32 = 50;

/// Identity of a card on the board.
///
/// A card created locally is keyed by its transaction until the server has
/// assigned it an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKey {
    Saved(IdeaId),
    Pending(TxnId),
}

impl CardKey {
    pub fn idea_id(self) -> Option<IdeaId> {
        match self {
            CardKey::Saved(id) => Some(id),
            CardKey::Pending(_) => None,
        }
    }
}

/// What the user typed into the "new idea" form.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
}

impl IdeaDraft {
    /// Applies the same normalisation the API does, so a placeholder looks
    /// like the row the server will echo back.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            category: self.category,
        }
    }

    fn matches(&self, idea: &Idea) -> bool {
        self.title == idea.title
            && self.description == idea.description
            && self.category == idea.category
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub key: CardKey,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub message_count: i32,
}

impl Card {
    fn saved(idea: Idea) -> Self {
        Self {
            key: CardKey::Saved(idea.id),
            title: idea.title,
            description: idea.description,
            category: idea.category,
            created_at: idea.created_at,
            message_count: idea.message_count,
        }
    }

    fn placeholder(txn: TxnId, draft: &IdeaDraft) -> Self {
        Self {
            key: CardKey::Pending(txn),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            created_at: Utc::now(),
            message_count: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.key, CardKey::Pending(_))
    }

    /// Thread progress in percent, saturating at [`FULL_THREAD`] messages.
    pub fn progress(&self) -> u8 {
        let n = self.message_count.clamp(0, FULL_THREAD);
        ((n * 100 + FULL_THREAD / 2) / FULL_THREAD).min(100) as u8
    }
}

/// One column as rendered.
#[derive(Debug)]
pub struct Column<'a> {
    pub category: Category,
    pub cards: Vec<&'a Card>,
}

impl Column<'_> {
    pub fn title(&self) -> &'static str {
        self.category.title()
    }

    pub fn count(&self) -> usize {
        self.cards.len()
    }
}

/// Where a dragged card is hovering or was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Column(Category),
    Card(CardKey),
}

/// A category change the caller must now send to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub txn: TxnId,
    pub id: IdeaId,
    pub to: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// No drag was in progress.
    Ignored,
    /// Released outside any target; the pre-drag order is back.
    Cancelled,
    /// Reordered within one column. Local only.
    Reordered { category: Category },
    /// Dropped in another column.
    Moved(PendingMove),
}

#[derive(Debug, Clone)]
enum BoardOp {
    Create {
        draft: IdeaDraft,
    },
    /// `from` follows the latest authoritative category seen while pending.
    Move {
        id: IdeaId,
        from: Category,
        to: Category,
    },
    Delete {
        card: Card,
        column: Category,
        position: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct OrderModel {
    lists: [Vec<CardKey>; 3],
}

impl OrderModel {
    fn slot(category: Category) -> usize {
        match category {
            Category::Working => 0,
            Category::Closed => 1,
            Category::Future => 2,
        }
    }

    fn list(&self, category: Category) -> &Vec<CardKey> {
        &self.lists[Self::slot(category)]
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<CardKey> {
        &mut self.lists[Self::slot(category)]
    }

    fn locate(&self, key: CardKey) -> Option<(Category, usize)> {
        Category::ALL.into_iter().find_map(|category| {
            self.list(category)
                .iter()
                .position(|k| *k == key)
                .map(|idx| (category, idx))
        })
    }

    fn remove(&mut self, key: CardKey) {
        for list in &mut self.lists {
            list.retain(|k| *k != key);
        }
    }

    fn replace(&mut self, from: CardKey, to: CardKey) {
        for list in &mut self.lists {
            for k in list.iter_mut().filter(|k| **k == from) {
                *k = to;
            }
        }
    }
}

#[derive(Debug)]
struct DragState {
    key: CardKey,
    origin: Category,
    snapshot: OrderModel,
}

#[derive(Debug, Default)]
pub struct BoardView {
    records: HashMap<CardKey, Card>,
    order: OrderModel,
    log: TxnLog<BoardOp>,
    drag: Option<DragState>,
    /// Ideas deleted here or remotely. Ids are never reused, so a late
    /// response or event naming one of them is stale.
    deleted: HashSet<IdeaId>,
}

impl BoardView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything with a fresh list from the API.
    ///
    /// Unconfirmed local speculation is discarded, and each column is laid out
    /// newest first.
    pub fn load(&mut self, mut ideas: Vec<Idea>) {
        ideas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.records.clear();
        self.order = OrderModel::default();
        self.log.clear();
        self.drag = None;
        for idea in ideas {
            self.deleted.remove(&idea.id);
            let card = Card::saved(idea);
            self.order.list_mut(card.category).push(card.key);
            self.records.insert(card.key, card);
        }
    }

    // ---- reads ----------------------------------------------------------

    pub fn card(&self, key: CardKey) -> Option<&Card> {
        self.records.get(&key)
    }

    pub fn saved(&self, id: IdeaId) -> Option<&Card> {
        self.card(CardKey::Saved(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Card keys of one column, top to bottom.
    pub fn order(&self, category: Category) -> &[CardKey] {
        self.order.list(category)
    }

    /// The column a card is currently displayed in.
    pub fn column_of(&self, key: CardKey) -> Option<Category> {
        self.order.locate(key).map(|(category, _)| category)
    }

    pub fn column(&self, category: Category) -> Column<'_> {
        Column {
            category,
            cards: self
                .order
                .list(category)
                .iter()
                .filter_map(|key| self.records.get(key))
                .collect(),
        }
    }

    pub fn columns(&self) -> Vec<Column<'_>> {
        Category::ALL.into_iter().map(|c| self.column(c)).collect()
    }

    pub fn pending(&self) -> usize {
        self.log.len()
    }

    pub fn dragging(&self) -> Option<CardKey> {
        self.drag.as_ref().map(|d| d.key)
    }

    // ---- reconcile ------------------------------------------------------

    /// Brings the order model back in line with the record map.
    ///
    /// Keys without a record are dropped, a key sitting in a column that does
    /// not match its record's category is taken out (unless it is the card
    /// being dragged), and records missing from their column are put at its
    /// head. Cards that are already in the right place keep their position.
    pub fn reconcile(&mut self) {
        let pinned = self.dragging();
        let mut seen = HashSet::new();

        for category in Category::ALL {
            let records = &self.records;
            self.order.list_mut(category).retain(|key| {
                let keep = match records.get(key) {
                    None => false,
                    Some(card) => card.category == category || Some(*key) == pinned,
                };
                keep && seen.insert(*key)
            });
        }

        let mut missing: Vec<&Card> = self
            .records
            .values()
            .filter(|card| !seen.contains(&card.key))
            .collect();
        missing.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let missing: Vec<(CardKey, Category)> =
            missing.into_iter().map(|c| (c.key, c.category)).collect();
        for (key, category) in missing {
            self.order.list_mut(category).insert(0, key);
        }
    }

    // ---- optimistic mutations -------------------------------------------

    /// Shows a placeholder card at the head of its column right away.
    pub fn begin_create(&mut self, draft: IdeaDraft) -> TxnId {
        let draft = draft.normalized();
        let txn = self.log.record(BoardOp::Create {
            draft: draft.clone(),
        });
        let card = Card::placeholder(txn, &draft);
        self.records.insert(card.key, card);
        self.reconcile();
        txn
    }

    /// The API returned the inserted row.
    ///
    /// The placeholder is swapped for the real card in place. When the
    /// realtime echo got there first, the row is only added if it is still
    /// unknown and has not been deleted since.
    pub fn confirm_create(&mut self, txn: TxnId, idea: Idea) -> Resolution {
        let resolution = match self.log.take_if(txn, is_create) {
            Some(_) => {
                self.settle_placeholder(txn, idea);
                Resolution::Confirmed
            }
            None => {
                if !self.deleted.contains(&idea.id) {
                    let key = CardKey::Saved(idea.id);
                    self.records.entry(key).or_insert_with(|| Card::saved(idea));
                }
                Resolution::AlreadyResolved
            }
        };
        self.reconcile();
        resolution
    }

    /// The create failed; the placeholder disappears.
    pub fn rollback_create(&mut self, txn: TxnId) -> Resolution {
        if self.log.take_if(txn, is_create).is_none() {
            return Resolution::AlreadyResolved;
        }
        self.records.remove(&CardKey::Pending(txn));
        self.reconcile();
        Resolution::RolledBack
    }

    /// Changes a card's category locally. `None` if the card is unknown or
    /// already in `to`.
    pub fn begin_move(&mut self, id: IdeaId, to: Category) -> Option<TxnId> {
        let card = self.records.get_mut(&CardKey::Saved(id))?;
        if card.category == to {
            return None;
        }
        let from = card.category;
        card.category = to;
        let txn = self.log.record(BoardOp::Move { id, from, to });
        self.reconcile();
        Some(txn)
    }

    pub fn confirm_move(&mut self, txn: TxnId) -> Resolution {
        match self.log.take_if(txn, is_move) {
            Some(_) => Resolution::Confirmed,
            None => Resolution::AlreadyResolved,
        }
    }

    /// The move failed. The card goes back to the last known category, but
    /// only if nothing else has moved it since.
    pub fn rollback_move(&mut self, txn: TxnId) -> Resolution {
        let Some(BoardOp::Move { id, from, to }) = self.log.take_if(txn, is_move) else {
            return Resolution::AlreadyResolved;
        };
        if let Some(card) = self.records.get_mut(&CardKey::Saved(id)) {
            if card.category == to {
                card.category = from;
            }
        }
        self.reconcile();
        Resolution::RolledBack
    }

    /// Removes a card locally, remembering where it was.
    pub fn begin_delete(&mut self, id: IdeaId) -> Option<TxnId> {
        let key = CardKey::Saved(id);
        let card = self.records.remove(&key)?;
        self.deleted.insert(id);
        let (column, position) = self.order.locate(key).unwrap_or((card.category, 0));
        self.order.remove(key);
        let txn = self.log.record(BoardOp::Delete {
            card,
            column,
            position,
        });
        self.reconcile();
        Some(txn)
    }

    pub fn confirm_delete(&mut self, txn: TxnId) -> Resolution {
        match self.log.take_if(txn, is_delete) {
            Some(_) => Resolution::Confirmed,
            None => Resolution::AlreadyResolved,
        }
    }

    /// The delete failed; the card comes back where it was.
    pub fn rollback_delete(&mut self, txn: TxnId) -> Resolution {
        let Some(BoardOp::Delete {
            card,
            column,
            position,
        }) = self.log.take_if(txn, is_delete)
        else {
            return Resolution::AlreadyResolved;
        };
        if let CardKey::Saved(id) = card.key {
            self.deleted.remove(&id);
        }
        if !self.records.contains_key(&card.key) {
            if card.category == column {
                let list = self.order.list_mut(column);
                let at = position.min(list.len());
                list.insert(at, card.key);
            }
            self.records.insert(card.key, card);
        }
        self.reconcile();
        Resolution::RolledBack
    }

    // ---- realtime -------------------------------------------------------

    /// Applies one change from the board channel.
    pub fn apply_remote(&mut self, event: ChangeEvent<Idea>) {
        match event {
            ChangeEvent::Insert { new } => self.remote_insert(new),
            ChangeEvent::Update { new } => self.remote_update(new),
            ChangeEvent::Delete { old } => self.remote_delete(old.id),
        }
        self.reconcile();
    }

    fn remote_insert(&mut self, idea: Idea) {
        let key = CardKey::Saved(idea.id);
        if self.records.contains_key(&key) || self.deleted.contains(&idea.id) {
            return;
        }
        let echo = self.log.find(|op| match op {
            BoardOp::Create { draft } => draft.matches(&idea),
            _ => false,
        });
        match echo {
            Some(txn) => {
                self.log.take_if(txn, is_create);
                self.settle_placeholder(txn, idea);
            }
            None => {
                self.records.insert(key, Card::saved(idea));
            }
        }
    }

    fn remote_update(&mut self, idea: Idea) {
        let key = CardKey::Saved(idea.id);
        if !self.records.contains_key(&key) {
            return;
        }
        let mut category = idea.category;
        if let Some(txn) = self.pending_move(idea.id) {
            let echoed = match self.log.get_mut(txn) {
                Some(BoardOp::Move { to, .. }) if *to == idea.category => true,
                Some(BoardOp::Move { from, to, .. }) => {
                    // Someone else's state: ours stays on screen until the
                    // response decides, and a rollback lands on theirs.
                    *from = idea.category;
                    category = *to;
                    false
                }
                _ => false,
            };
            if echoed {
                self.log.take_if(txn, is_move);
            }
        }
        let mut card = Card::saved(idea);
        card.category = category;
        self.records.insert(key, card);
    }

    fn remote_delete(&mut self, id: IdeaId) {
        self.deleted.insert(id);
        let key = CardKey::Saved(id);
        self.records.remove(&key);
        self.order.remove(key);
        if let Some(txn) = self.pending_delete(id) {
            self.log.take_if(txn, is_delete);
        }
        while let Some(txn) = self.pending_move(id) {
            self.log.take_if(txn, is_move);
        }
    }

    fn pending_move(&self, id: IdeaId) -> Option<TxnId> {
        self.log
            .find(|op| matches!(op, BoardOp::Move { id: moved, .. } if *moved == id))
    }

    fn pending_delete(&self, id: IdeaId) -> Option<TxnId> {
        self.log
            .find(|op| matches!(op, BoardOp::Delete { card, .. } if card.key == CardKey::Saved(id)))
    }

    fn settle_placeholder(&mut self, txn: TxnId, idea: Idea) {
        let placeholder = CardKey::Pending(txn);
        let key = CardKey::Saved(idea.id);
        self.records.remove(&placeholder);
        if self.records.contains_key(&key) {
            self.order.remove(placeholder);
        } else {
            self.order.replace(placeholder, key);
            self.records.insert(key, Card::saved(idea));
        }
    }

    // ---- drag and drop --------------------------------------------------

    /// Starts dragging a saved card. Placeholders cannot be dragged.
    pub fn drag_start(&mut self, key: CardKey) -> bool {
        if matches!(key, CardKey::Pending(_)) || self.drag.is_some() {
            return false;
        }
        let Some((origin, _)) = self.order.locate(key) else {
            return false;
        };
        self.drag = Some(DragState {
            key,
            origin,
            snapshot: self.order.clone(),
        });
        true
    }

    /// Live preview: hovering over another column moves the card there
    /// visually, without touching its category.
    pub fn drag_over(&mut self, target: DropTarget) {
        let Some(key) = self.dragging() else {
            return;
        };
        let Some((from, _)) = self.order.locate(key) else {
            return;
        };
        let (to, at) = match target {
            DropTarget::Column(category) => (category, None),
            DropTarget::Card(over) => match self.order.locate(over) {
                Some((category, idx)) => (category, Some(idx)),
                None => return,
            },
        };
        if from == to {
            return;
        }
        self.order.list_mut(from).retain(|k| *k != key);
        let list = self.order.list_mut(to);
        let at = at.unwrap_or(list.len()).min(list.len());
        list.insert(at, key);
    }

    /// Ends the drag.
    ///
    /// No target restores the order from drag start. A drop in the origin
    /// column reorders it for good. A drop anywhere else changes the card's
    /// category optimistically and hands back the move to send.
    pub fn drag_end(&mut self, target: Option<DropTarget>) -> DragOutcome {
        let Some(drag) = self.drag.take() else {
            return DragOutcome::Ignored;
        };
        let destination = target.and_then(|target| match target {
            DropTarget::Column(category) => Some((category, None)),
            DropTarget::Card(over) => self
                .order
                .locate(over)
                .map(|(category, idx)| (category, Some(idx))),
        });
        let Some((to, over_idx)) = destination else {
            self.order = drag.snapshot;
            self.reconcile();
            return DragOutcome::Cancelled;
        };
        if !self.records.contains_key(&drag.key) {
            self.reconcile();
            return DragOutcome::Cancelled;
        }

        if self.order.locate(drag.key).map(|(c, _)| c) != Some(to) {
            self.order.remove(drag.key);
            let list = self.order.list_mut(to);
            let at = over_idx.unwrap_or(list.len()).min(list.len());
            list.insert(at, drag.key);
        } else if to == drag.origin {
            let list = self.order.list_mut(to);
            if let Some(old) = list.iter().position(|k| *k == drag.key) {
                let item = list.remove(old);
                let new = over_idx.unwrap_or(list.len()).min(list.len());
                list.insert(new, item);
            }
        }

        let moved = drag.key.idea_id().and_then(|id| {
            self.begin_move(id, to)
                .map(|txn| PendingMove { txn, id, to })
        });
        self.reconcile();
        match moved {
            Some(pending) => DragOutcome::Moved(pending),
            None => DragOutcome::Reordered { category: to },
        }
    }
}

fn is_create(op: &BoardOp) -> bool {
    matches!(op, BoardOp::Create { .. })
}

fn is_move(op: &BoardOp) -> bool {
    matches!(op, BoardOp::Move { .. })
}

fn is_delete(op: &BoardOp) -> bool {
    matches!(op, BoardOp::Delete { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn idea(title: &str, category: Category, age_secs: i64) -> Idea {
        Idea {
            id: IdeaId::new(),
            title: title.into(),
            description: None,
            category,
            created_at: Utc::now() - Duration::seconds(age_secs),
            message_count: 0,
        }
    }

    fn draft(title: &str, category: Category) -> IdeaDraft {
        IdeaDraft {
            title: title.into(),
            description: None,
            category,
        }
    }

    fn titles(view: &BoardView, category: Category) -> Vec<String> {
        view.column(category)
            .cards
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    fn occurrences(view: &BoardView, key: CardKey) -> usize {
        Category::ALL
            .into_iter()
            .map(|c| view.order(c).iter().filter(|k| **k == key).count())
            .sum()
    }

    #[test]
    fn load_lays_out_columns_newest_first() {
        let mut view = BoardView::new();
        view.load(vec![
            idea("old", Category::Working, 30),
            idea("new", Category::Working, 1),
            idea("later", Category::Future, 5),
        ]);
        assert_eq!(titles(&view, Category::Working), ["new", "old"]);
        assert_eq!(titles(&view, Category::Future), ["later"]);
        assert_eq!(view.column(Category::Closed).count(), 0);
        assert_eq!(view.column(Category::Future).title(), "Idea for Future");
    }

    #[test]
    fn reconcile_moves_recategorised_cards_to_the_head_without_reshuffling() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 3);
        let b = idea("b", Category::Working, 2);
        let c = idea("c", Category::Future, 1);
        view.load(vec![a.clone(), b.clone(), c]);

        let mut moved = a.clone();
        moved.category = Category::Future;
        view.apply_remote(ChangeEvent::Update { new: moved });

        assert_eq!(titles(&view, Category::Working), ["b"]);
        assert_eq!(titles(&view, Category::Future), ["a", "c"]);
        assert_eq!(occurrences(&view, CardKey::Saved(a.id)), 1);
    }

    #[test]
    fn create_shows_placeholder_then_swaps_in_place() {
        let mut view = BoardView::new();
        view.load(vec![idea("existing", Category::Working, 10)]);

        let txn = view.begin_create(draft("  Widget ", Category::Working));
        let placeholder = view.order(Category::Working)[0];
        assert_eq!(placeholder, CardKey::Pending(txn));
        assert!(view.card(placeholder).unwrap().is_pending());
        assert_eq!(view.card(placeholder).unwrap().title, "Widget");

        let saved = idea("Widget", Category::Working, 0);
        assert_eq!(view.confirm_create(txn, saved.clone()), Resolution::Confirmed);
        assert_eq!(view.order(Category::Working)[0], CardKey::Saved(saved.id));
        assert_eq!(view.len(), 2);
        assert_eq!(view.pending(), 0);
    }

    #[test]
    fn echo_before_response_resolves_create_exactly_once() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        let saved = idea("Widget", Category::Working, 0);

        view.apply_remote(ChangeEvent::Insert { new: saved.clone() });
        assert_eq!(view.len(), 1);
        assert!(view.card(CardKey::Pending(txn)).is_none());

        assert_eq!(
            view.confirm_create(txn, saved.clone()),
            Resolution::AlreadyResolved
        );
        assert_eq!(view.len(), 1);
        assert_eq!(occurrences(&view, CardKey::Saved(saved.id)), 1);
    }

    #[test]
    fn late_create_response_does_not_revive_a_remotely_deleted_idea() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        let saved = idea("Widget", Category::Working, 0);

        view.apply_remote(ChangeEvent::Insert { new: saved.clone() });
        view.apply_remote(ChangeEvent::Delete { old: saved.clone() });
        assert_eq!(
            view.confirm_create(txn, saved.clone()),
            Resolution::AlreadyResolved
        );

        assert!(view.saved(saved.id).is_none());
        assert!(view.is_empty());
        assert_eq!(occurrences(&view, CardKey::Saved(saved.id)), 0);
    }

    #[test]
    fn late_create_response_does_not_revive_a_locally_deleted_idea() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        let saved = idea("Widget", Category::Working, 0);
        view.apply_remote(ChangeEvent::Insert { new: saved.clone() });

        let delete = view.begin_delete(saved.id).unwrap();
        assert_eq!(view.confirm_delete(delete), Resolution::Confirmed);
        view.confirm_create(txn, saved.clone());
        assert!(view.saved(saved.id).is_none());

        // The echo of the insert, replayed late, is stale as well.
        view.apply_remote(ChangeEvent::Insert { new: saved.clone() });
        assert!(view.is_empty());
    }

    #[test]
    fn failed_delete_lets_the_idea_be_confirmed_again() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        let saved = idea("Widget", Category::Working, 0);
        view.apply_remote(ChangeEvent::Insert { new: saved.clone() });

        let delete = view.begin_delete(saved.id).unwrap();
        view.rollback_delete(delete);
        view.confirm_create(txn, saved.clone());
        assert_eq!(occurrences(&view, CardKey::Saved(saved.id)), 1);
    }

    #[test]
    fn failed_create_removes_the_placeholder() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Closed));
        assert_eq!(view.rollback_create(txn), Resolution::RolledBack);
        assert!(view.is_empty());
        assert!(view.order(Category::Closed).is_empty());
    }

    #[test]
    fn duplicate_remote_inserts_are_ignored() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.apply_remote(ChangeEvent::Insert { new: a.clone() });
        view.apply_remote(ChangeEvent::Insert { new: a.clone() });
        assert_eq!(view.len(), 1);
        assert_eq!(occurrences(&view, CardKey::Saved(a.id)), 1);
    }

    #[test]
    fn failed_move_restores_the_previous_category() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.load(vec![a.clone()]);

        let txn = view.begin_move(a.id, Category::Closed).unwrap();
        assert_eq!(view.column_of(CardKey::Saved(a.id)), Some(Category::Closed));

        assert_eq!(view.rollback_move(txn), Resolution::RolledBack);
        assert_eq!(view.saved(a.id).unwrap().category, Category::Working);
        assert_eq!(view.column_of(CardKey::Saved(a.id)), Some(Category::Working));
    }

    #[test]
    fn move_to_the_current_category_is_a_noop() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.load(vec![a.clone()]);
        assert!(view.begin_move(a.id, Category::Working).is_none());
        assert_eq!(view.pending(), 0);
    }

    #[test]
    fn move_echo_confirms_and_later_response_is_a_noop() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.load(vec![a.clone()]);
        let txn = view.begin_move(a.id, Category::Future).unwrap();

        let mut echoed = a.clone();
        echoed.category = Category::Future;
        view.apply_remote(ChangeEvent::Update { new: echoed });

        assert_eq!(view.pending(), 0);
        assert_eq!(view.rollback_move(txn), Resolution::AlreadyResolved);
        assert_eq!(view.saved(a.id).unwrap().category, Category::Future);
    }

    #[test]
    fn stale_update_during_pending_move_keeps_the_optimistic_column() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.load(vec![a.clone()]);
        let txn = view.begin_move(a.id, Category::Future).unwrap();

        let mut counted = a.clone();
        counted.category = Category::Closed;
        counted.message_count = 3;
        view.apply_remote(ChangeEvent::Update { new: counted });

        let card = view.saved(a.id).unwrap();
        assert_eq!(card.category, Category::Future);
        assert_eq!(card.message_count, 3);

        view.rollback_move(txn);
        assert_eq!(view.saved(a.id).unwrap().category, Category::Closed);
    }

    #[test]
    fn failed_delete_restores_the_card_at_its_position() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        let b = idea("b", Category::Working, 2);
        let c = idea("c", Category::Working, 3);
        view.load(vec![a, b.clone(), c]);

        let txn = view.begin_delete(b.id).unwrap();
        assert_eq!(titles(&view, Category::Working), ["a", "c"]);

        assert_eq!(view.rollback_delete(txn), Resolution::RolledBack);
        assert_eq!(titles(&view, Category::Working), ["a", "b", "c"]);
    }

    #[test]
    fn remote_delete_confirms_a_pending_delete() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        view.load(vec![a.clone()]);
        let txn = view.begin_delete(a.id).unwrap();

        view.apply_remote(ChangeEvent::Delete { old: a.clone() });
        assert_eq!(view.rollback_delete(txn), Resolution::AlreadyResolved);
        assert!(view.is_empty());
    }

    #[test]
    fn reload_discards_speculation() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        view.load(vec![idea("server", Category::Future, 1)]);

        assert_eq!(view.pending(), 0);
        assert_eq!(view.len(), 1);
        assert_eq!(view.rollback_create(txn), Resolution::AlreadyResolved);
    }

    #[test]
    fn drag_within_a_column_reorders_locally() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        let b = idea("b", Category::Working, 2);
        let c = idea("c", Category::Working, 3);
        view.load(vec![a.clone(), b, c.clone()]);

        assert!(view.drag_start(CardKey::Saved(a.id)));
        let outcome = view.drag_end(Some(DropTarget::Card(CardKey::Saved(c.id))));

        assert_eq!(
            outcome,
            DragOutcome::Reordered {
                category: Category::Working
            }
        );
        assert_eq!(titles(&view, Category::Working), ["b", "c", "a"]);
        assert_eq!(view.pending(), 0);
    }

    #[test]
    fn drag_across_columns_previews_then_moves() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        let f = idea("f", Category::Future, 2);
        view.load(vec![a.clone(), f.clone()]);
        let key = CardKey::Saved(a.id);

        view.drag_start(key);
        view.drag_over(DropTarget::Card(CardKey::Saved(f.id)));
        assert_eq!(titles(&view, Category::Future), ["a", "f"]);
        assert_eq!(view.saved(a.id).unwrap().category, Category::Working);

        // A remote event mid-drag must not yank the card back.
        view.apply_remote(ChangeEvent::Insert {
            new: idea("other", Category::Closed, 0),
        });
        assert_eq!(view.column_of(key), Some(Category::Future));

        let outcome = view.drag_end(Some(DropTarget::Column(Category::Future)));
        let DragOutcome::Moved(pending) = outcome else {
            panic!("expected a move, got {outcome:?}");
        };
        assert_eq!(pending.id, a.id);
        assert_eq!(pending.to, Category::Future);
        assert_eq!(titles(&view, Category::Future), ["a", "f"]);
        assert_eq!(view.saved(a.id).unwrap().category, Category::Future);
        assert_eq!(occurrences(&view, key), 1);
    }

    #[test]
    fn cancelled_drag_restores_the_pre_drag_order() {
        let mut view = BoardView::new();
        let a = idea("a", Category::Working, 1);
        let b = idea("b", Category::Working, 2);
        view.load(vec![a.clone(), b]);

        view.drag_start(CardKey::Saved(a.id));
        view.drag_over(DropTarget::Column(Category::Closed));
        assert_eq!(view.drag_end(None), DragOutcome::Cancelled);

        assert_eq!(titles(&view, Category::Working), ["a", "b"]);
        assert!(view.order(Category::Closed).is_empty());
        assert!(view.dragging().is_none());
    }

    #[test]
    fn placeholders_cannot_be_dragged() {
        let mut view = BoardView::new();
        let txn = view.begin_create(draft("Widget", Category::Working));
        assert!(!view.drag_start(CardKey::Pending(txn)));
        assert_eq!(view.drag_end(None), DragOutcome::Ignored);
    }

    #[test]
    fn progress_saturates_at_fifty_messages() {
        let mut card = Card::saved(idea("a", Category::Working, 0));
        assert_eq!(card.progress(), 0);
        card.message_count = 1;
        assert_eq!(card.progress(), 2);
        card.message_count = 25;
        assert_eq!(card.progress(), 50);
        card.message_count = 80;
        assert_eq!(card.progress(), 100);
    }
}

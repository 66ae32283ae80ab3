//! Discussion thread of one idea, with optimistic posting.

use chrono::{DateTime, Utc};
use domains::{ChangeEvent, IdeaId, Message, MessageId};

use crate::txn::{Resolution, TxnId, TxnLog};

/// Shown for messages without an author name.
pub const GUEST: &str = "Guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Saved(MessageId),
    Pending(TxnId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadEntry {
    pub key: EntryKey,
    pub text: String,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ThreadEntry {
    fn saved(message: Message) -> Self {
        Self {
            key: EntryKey::Saved(message.id),
            text: message.text,
            author_name: message.author_name,
            created_at: message.created_at,
        }
    }

    pub fn author(&self) -> &str {
        self.author_name.as_deref().unwrap_or(GUEST)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.key, EntryKey::Pending(_))
    }
}

#[derive(Debug)]
struct PendingPost {
    text: String,
    author_name: Option<String>,
}

impl PendingPost {
    fn matches(&self, message: &Message) -> bool {
        self.text == message.text && self.author_name == message.author_name
    }
}

/// Messages of the open thread, oldest first.
#[derive(Debug)]
pub struct ThreadView {
    idea_id: IdeaId,
    entries: Vec<ThreadEntry>,
    log: TxnLog<PendingPost>,
}

impl ThreadView {
    pub fn new(idea_id: IdeaId) -> Self {
        Self {
            idea_id,
            entries: Vec::new(),
            log: TxnLog::new(),
        }
    }

    pub fn idea_id(&self) -> IdeaId {
        self.idea_id
    }

    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.log.len()
    }

    /// Replaces the thread with a fresh list; rows for other ideas are ignored.
    pub fn load(&mut self, messages: Vec<Message>) {
        let mut messages: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.idea_id == self.idea_id)
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.entries = messages.into_iter().map(ThreadEntry::saved).collect();
        self.log.clear();
    }

    /// Appends a placeholder. `None` when the text is blank.
    pub fn begin_post(&mut self, text: &str, author_name: Option<&str>) -> Option<TxnId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let author_name = author_name
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let txn = self.log.record(PendingPost {
            text: text.to_string(),
            author_name: author_name.clone(),
        });
        self.entries.push(ThreadEntry {
            key: EntryKey::Pending(txn),
            text: text.to_string(),
            author_name,
            created_at: Utc::now(),
        });
        Some(txn)
    }

    /// The API returned the inserted rows; they take the placeholder's place.
    pub fn confirm_post(&mut self, txn: TxnId, rows: Vec<Message>) -> Resolution {
        let resolution = if self.log.take_if(txn, |_| true).is_some() {
            Resolution::Confirmed
        } else {
            Resolution::AlreadyResolved
        };
        let placeholder = self.position(EntryKey::Pending(txn));
        if let Some(at) = placeholder {
            self.entries.remove(at);
        }
        let mut at = placeholder.unwrap_or(self.entries.len());
        for row in rows {
            if row.idea_id != self.idea_id || self.position(EntryKey::Saved(row.id)).is_some() {
                continue;
            }
            self.entries.insert(at, ThreadEntry::saved(row));
            at += 1;
        }
        resolution
    }

    /// The post failed; the placeholder goes away.
    pub fn rollback_post(&mut self, txn: TxnId) -> Resolution {
        if self.log.take_if(txn, |_| true).is_none() {
            return Resolution::AlreadyResolved;
        }
        if let Some(at) = self.position(EntryKey::Pending(txn)) {
            self.entries.remove(at);
        }
        Resolution::RolledBack
    }

    /// Applies one change from the thread channel. Events for other ideas are
    /// dropped.
    pub fn apply_remote(&mut self, event: ChangeEvent<Message>) {
        if event.record().idea_id != self.idea_id {
            return;
        }
        match event {
            ChangeEvent::Insert { new } => {
                if self.position(EntryKey::Saved(new.id)).is_some() {
                    return;
                }
                let echo = self.log.find(|post| post.matches(&new));
                let at = echo.and_then(|txn| {
                    self.log.take_if(txn, |_| true);
                    self.position(EntryKey::Pending(txn))
                });
                match at {
                    Some(at) => self.entries[at] = ThreadEntry::saved(new),
                    None => self.entries.push(ThreadEntry::saved(new)),
                }
            }
            ChangeEvent::Update { new } => {
                if let Some(at) = self.position(EntryKey::Saved(new.id)) {
                    self.entries[at] = ThreadEntry::saved(new);
                }
            }
            ChangeEvent::Delete { old } => {
                self.entries.retain(|e| e.key != EntryKey::Saved(old.id));
            }
        }
    }

    fn position(&self, key: EntryKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(idea_id: IdeaId, text: &str, author: Option<&str>) -> Message {
        Message {
            id: MessageId::new(),
            idea_id,
            text: text.into(),
            author_name: author.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    fn texts(view: &ThreadView) -> Vec<&str> {
        view.entries().iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn missing_author_renders_as_guest() {
        let idea = IdeaId::new();
        let mut view = ThreadView::new(idea);
        view.load(vec![message(idea, "hi", None), message(idea, "yo", Some("Ada"))]);
        assert_eq!(view.entries()[0].author(), "Guest");
        assert_eq!(view.entries()[1].author(), "Ada");
    }

    #[test]
    fn blank_text_is_not_posted() {
        let mut view = ThreadView::new(IdeaId::new());
        assert!(view.begin_post("   ", Some("Ada")).is_none());
        assert!(view.is_empty());
    }

    #[test]
    fn post_swaps_placeholder_for_the_returned_row() {
        let idea = IdeaId::new();
        let mut view = ThreadView::new(idea);
        view.load(vec![message(idea, "first", None)]);

        let txn = view.begin_post(" second ", Some("Ada")).unwrap();
        assert!(view.entries()[1].is_pending());
        assert_eq!(view.entries()[1].text, "second");

        let row = message(idea, "second", Some("Ada"));
        assert_eq!(view.confirm_post(txn, vec![row.clone()]), Resolution::Confirmed);
        assert_eq!(texts(&view), ["first", "second"]);
        assert_eq!(view.entries()[1].key, EntryKey::Saved(row.id));
    }

    #[test]
    fn echo_and_response_append_the_message_once() {
        let idea = IdeaId::new();
        let mut view = ThreadView::new(idea);
        let txn = view.begin_post("hello", Some("Ada")).unwrap();
        let row = message(idea, "hello", Some("Ada"));

        view.apply_remote(ChangeEvent::Insert { new: row.clone() });
        assert_eq!(view.len(), 1);
        assert!(!view.entries()[0].is_pending());

        assert_eq!(view.confirm_post(txn, vec![row]), Resolution::AlreadyResolved);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn failed_post_removes_the_placeholder() {
        let mut view = ThreadView::new(IdeaId::new());
        let txn = view.begin_post("hello", None).unwrap();
        assert_eq!(view.rollback_post(txn), Resolution::RolledBack);
        assert!(view.is_empty());
        assert_eq!(view.pending(), 0);
    }

    #[test]
    fn events_for_other_ideas_are_ignored() {
        let mut view = ThreadView::new(IdeaId::new());
        view.apply_remote(ChangeEvent::Insert {
            new: message(IdeaId::new(), "elsewhere", None),
        });
        assert!(view.is_empty());
    }

    #[test]
    fn remote_insert_from_someone_else_is_appended() {
        let idea = IdeaId::new();
        let mut view = ThreadView::new(idea);
        view.begin_post("mine", Some("Ada")).unwrap();
        view.apply_remote(ChangeEvent::Insert {
            new: message(idea, "theirs", Some("Bob")),
        });
        assert_eq!(texts(&view), ["mine", "theirs"]);
        assert_eq!(view.pending(), 1);
    }
}

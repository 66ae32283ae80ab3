//! # Board Session
//!
//! Drives a [`BoardView`] and the open [`ThreadView`] against a [`BoardApi`].
//!
//! Every user action is split in two. `begin_*` applies it to the view right
//! away and hands back an [`InFlight`] request that does not borrow the
//! session; `finish_*` takes the [`Reply`] and confirms or rolls back. While
//! a request is out, the session keeps rendering and keeps applying realtime
//! changes through [`BoardSession::next_event`], so an echo may settle a
//! change before its own response does. The plain async methods
//! (`create_idea`, `move_idea`, ...) chain the two halves for callers that
//! have nothing else to do in between.

use std::future::Future;
use std::sync::Arc;

use domains::{Category, ChangeEvent, Idea, IdeaId, Message};
use futures::future::BoxFuture;

use crate::api::BoardApi;
use crate::board::{BoardView, CardKey, DragOutcome, DropTarget, IdeaDraft, PendingMove};
use crate::error::ClientError;
use crate::sse::Subscription;
use crate::thread::{ThreadView, GUEST};
use crate::txn::TxnId;

/// A realtime change that was applied to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Board(ChangeEvent<Idea>),
    Thread(ChangeEvent<Message>),
}

/// Where a request came from, so its reply lands on the right view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Origin {
    txn: TxnId,
    idea_id: Option<IdeaId>,
    /// Which opening of a thread a post belongs to. Thread logs restart their
    /// ids, so a reply for a closed thread must not resolve a newer one.
    thread: Option<u64>,
}

/// A request whose optimistic effect is already visible.
#[must_use = "the change stays pending until its reply is finished"]
pub struct InFlight<T> {
    origin: Origin,
    request: BoxFuture<'static, Result<T, ClientError>>,
}

impl<T> InFlight<T> {
    fn new(
        origin: Origin,
        request: impl Future<Output = Result<T, ClientError>> + Send + 'static,
    ) -> Self {
        Self {
            origin,
            request: Box::pin(request),
        }
    }

    pub fn txn(&self) -> TxnId {
        self.origin.txn
    }

    /// Performs the request.
    pub async fn send(self) -> Reply<T> {
        Reply {
            origin: self.origin,
            result: self.request.await,
        }
    }
}

impl<T> std::fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// The outcome of an [`InFlight`] request, to be handed to `finish_*`.
#[derive(Debug)]
#[must_use = "the change stays pending until its reply is finished"]
pub struct Reply<T> {
    origin: Origin,
    pub result: Result<T, ClientError>,
}

impl<T> Reply<T> {
    pub fn txn(&self) -> TxnId {
        self.origin.txn
    }
}

struct OpenThread {
    view: ThreadView,
    channel: Option<Subscription<Message>>,
    opened: u64,
}

pub struct BoardSession {
    api: Arc<dyn BoardApi>,
    board: BoardView,
    board_channel: Option<Subscription<Idea>>,
    thread: Option<OpenThread>,
    threads_opened: u64,
    display_name: String,
}

impl BoardSession {
    pub fn new(api: Arc<dyn BoardApi>) -> Self {
        Self {
            api,
            board: BoardView::new(),
            board_channel: None,
            thread: None,
            threads_opened: 0,
            display_name: GUEST.to_string(),
        }
    }

    pub fn board(&self) -> &BoardView {
        &self.board
    }

    pub fn thread(&self) -> Option<&ThreadView> {
        self.thread.as_ref().map(|t| &t.view)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Sets the name used for new messages. Blank falls back to "Guest".
    pub fn set_display_name(&mut self, name: &str) {
        let name = name.trim();
        self.display_name = if name.is_empty() { GUEST } else { name }.to_string();
    }

    /// Subscribes to the board channel, then loads the board.
    ///
    /// Subscribing first means nothing committed after the load is missed.
    /// Without a channel the board still works, it just stops being live.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        match self.api.subscribe_board().await {
            Ok(channel) => self.board_channel = Some(channel),
            Err(err) => tracing::warn!(error = %err, "board channel unavailable"),
        }
        self.reload().await
    }

    /// Full reload from the API, discarding local speculation.
    pub async fn reload(&mut self) -> Result<(), ClientError> {
        let ideas = self.api.list_ideas().await?;
        tracing::debug!(count = ideas.len(), "board loaded");
        self.board.load(ideas);
        Ok(())
    }

    // ---- ideas ----------------------------------------------------------

    /// Shows a placeholder card and prepares the create request.
    pub fn begin_create(&mut self, draft: IdeaDraft) -> InFlight<Idea> {
        let draft = draft.normalized();
        let txn = self.board.begin_create(draft.clone());
        let api = Arc::clone(&self.api);
        InFlight::new(board_origin(txn, None), async move {
            api.create_idea(draft).await
        })
    }

    /// Settles a create. The error is handed back so the caller can tell the
    /// user; the placeholder is already gone by then.
    pub fn finish_create(&mut self, reply: Reply<Idea>) -> Result<IdeaId, ClientError> {
        let txn = reply.txn();
        match reply.result {
            Ok(idea) => {
                let id = idea.id;
                self.board.confirm_create(txn, idea);
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(%txn, error = %err, "create failed, removing placeholder");
                self.board.rollback_create(txn);
                Err(err)
            }
        }
    }

    pub async fn create_idea(&mut self, draft: IdeaDraft) -> Result<IdeaId, ClientError> {
        let request = self.begin_create(draft);
        let reply = request.send().await;
        self.finish_create(reply)
    }

    /// Moves the card locally. `None` when there is nothing to send.
    pub fn begin_move(&mut self, id: IdeaId, to: Category) -> Option<InFlight<()>> {
        let txn = self.board.begin_move(id, to)?;
        Some(self.request_move(PendingMove { txn, id, to }))
    }

    /// The request for a move the view has already applied, e.g. a drop.
    pub fn request_move(&self, pending: PendingMove) -> InFlight<()> {
        let api = Arc::clone(&self.api);
        InFlight::new(board_origin(pending.txn, Some(pending.id)), async move {
            api.update_category(pending.id, pending.to).await
        })
    }

    pub fn finish_move(&mut self, reply: Reply<()>) {
        let txn = reply.txn();
        match reply.result {
            Ok(()) => {
                self.board.confirm_move(txn);
            }
            Err(err) => {
                tracing::warn!(
                    %txn,
                    idea_id = ?reply.origin.idea_id,
                    error = %err,
                    "move failed, rolling back"
                );
                self.board.rollback_move(txn);
            }
        }
    }

    pub async fn move_idea(&mut self, id: IdeaId, to: Category) {
        if let Some(request) = self.begin_move(id, to) {
            let reply = request.send().await;
            self.finish_move(reply);
        }
    }

    /// Removes the card locally. Closing its thread is up to the caller.
    pub fn begin_delete(&mut self, id: IdeaId) -> Option<InFlight<()>> {
        let txn = self.board.begin_delete(id)?;
        let api = Arc::clone(&self.api);
        Some(InFlight::new(board_origin(txn, Some(id)), async move {
            api.delete_idea(id).await
        }))
    }

    pub fn finish_delete(&mut self, reply: Reply<()>) {
        let txn = reply.txn();
        match reply.result {
            Ok(()) => {
                self.board.confirm_delete(txn);
            }
            Err(err) => {
                tracing::warn!(
                    %txn,
                    idea_id = ?reply.origin.idea_id,
                    error = %err,
                    "delete failed, restoring card"
                );
                self.board.rollback_delete(txn);
            }
        }
    }

    pub async fn delete_idea(&mut self, id: IdeaId) {
        if let Some(request) = self.begin_delete(id) {
            let reply = request.send().await;
            self.finish_delete(reply);
        }
    }

    // ---- drag and drop --------------------------------------------------

    pub fn drag_start(&mut self, key: CardKey) -> bool {
        self.board.drag_start(key)
    }

    pub fn drag_over(&mut self, target: DropTarget) {
        self.board.drag_over(target);
    }

    /// Ends a drag. A drop in another column comes with the move to send.
    pub fn begin_drag_end(
        &mut self,
        target: Option<DropTarget>,
    ) -> (DragOutcome, Option<InFlight<()>>) {
        let outcome = self.board.drag_end(target);
        let request = match outcome {
            DragOutcome::Moved(pending) => Some(self.request_move(pending)),
            _ => None,
        };
        (outcome, request)
    }

    pub async fn drag_end(&mut self, target: Option<DropTarget>) -> DragOutcome {
        let (outcome, request) = self.begin_drag_end(target);
        if let Some(request) = request {
            let reply = request.send().await;
            self.finish_move(reply);
        }
        outcome
    }

    // ---- threads --------------------------------------------------------

    /// Opens the thread of `idea_id`, closing any other one first.
    ///
    /// A failed load leaves an empty thread, and a failed subscription leaves
    /// a thread that is not live.
    pub async fn open_thread(&mut self, idea_id: IdeaId) {
        self.close_thread();
        let channel = match self.api.subscribe_thread(idea_id).await {
            Ok(channel) => Some(channel),
            Err(err) => {
                tracing::warn!(%idea_id, error = %err, "thread channel unavailable");
                None
            }
        };
        let mut view = ThreadView::new(idea_id);
        match self.api.list_messages(idea_id).await {
            Ok(messages) => view.load(messages),
            Err(err) => tracing::warn!(%idea_id, error = %err, "could not load thread"),
        }
        self.threads_opened += 1;
        self.thread = Some(OpenThread {
            view,
            channel,
            opened: self.threads_opened,
        });
    }

    pub fn close_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            tracing::debug!(idea_id = %thread.view.idea_id(), "thread closed");
        }
    }

    /// Shows the message in the open thread under the current display name.
    /// `None` without an open thread or for a blank message.
    pub fn begin_post(&mut self, text: &str) -> Option<InFlight<Vec<Message>>> {
        let author = self.display_name.clone();
        let thread = self.thread.as_mut()?;
        let idea_id = thread.view.idea_id();
        let txn = thread.view.begin_post(text, Some(author.as_str()))?;
        let origin = Origin {
            txn,
            idea_id: Some(idea_id),
            thread: Some(thread.opened),
        };
        let api = Arc::clone(&self.api);
        let text = text.trim().to_string();
        Some(InFlight::new(origin, async move {
            api.post_message(idea_id, text, Some(author)).await
        }))
    }

    /// Settles a post. A reply for a thread that has been closed since is
    /// dropped.
    pub fn finish_post(&mut self, reply: Reply<Vec<Message>>) {
        let txn = reply.txn();
        let Some(thread) = self
            .thread
            .as_mut()
            .filter(|t| Some(t.opened) == reply.origin.thread)
        else {
            tracing::debug!(%txn, "thread closed before the post was answered");
            return;
        };
        match reply.result {
            Ok(rows) => {
                thread.view.confirm_post(txn, rows);
            }
            Err(err) => {
                tracing::warn!(
                    %txn,
                    idea_id = %thread.view.idea_id(),
                    error = %err,
                    "post failed, removing message"
                );
                thread.view.rollback_post(txn);
            }
        }
    }

    pub async fn post_message(&mut self, text: &str) {
        if let Some(request) = self.begin_post(text) {
            let reply = request.send().await;
            self.finish_post(reply);
        }
    }

    /// Waits for the next realtime change on any open channel and applies it.
    /// `None` once no channel is left.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let thread_channel = self.thread.as_mut().and_then(|t| t.channel.as_mut());
        let event = tokio::select! {
            Some(change) = next_change(self.board_channel.as_mut()) => SessionEvent::Board(change),
            Some(change) = next_change(thread_channel) => SessionEvent::Thread(change),
            else => return None,
        };
        match &event {
            SessionEvent::Board(change) => self.board.apply_remote(change.clone()),
            SessionEvent::Thread(change) => {
                if let Some(thread) = self.thread.as_mut() {
                    thread.view.apply_remote(change.clone());
                }
            }
        }
        Some(event)
    }
}

fn board_origin(txn: TxnId, idea_id: Option<IdeaId>) -> Origin {
    Origin {
        txn,
        idea_id,
        thread: None,
    }
}

async fn next_change<T>(channel: Option<&mut Subscription<T>>) -> Option<ChangeEvent<T>> {
    match channel {
        Some(channel) => channel.next().await,
        None => None,
    }
}

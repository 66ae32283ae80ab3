//! # Core Traits (Ports)
//!
//! Any store adapter must implement these traits to be used by the services.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::DomainResult;
use crate::events::StoreChange;
use crate::models::{Category, Idea, IdeaId, Message, NewIdea, NewMessage};

/// Persistence contract for ideas.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdeaRepository: Send + Sync {
    /// All ideas, newest first.
    async fn list_ideas(&self) -> DomainResult<Vec<Idea>>;

    /// Persists a new idea and returns it with its server id and timestamp.
    async fn insert_idea(&self, idea: NewIdea) -> DomainResult<Idea>;

    /// Re-categorises an idea. Absent ids are a silent no-op.
    async fn update_category(&self, id: IdeaId, category: Category) -> DomainResult<()>;

    /// Removes an idea and its thread. Absent ids are a silent no-op.
    async fn delete_idea(&self, id: IdeaId) -> DomainResult<()>;
}

/// Persistence contract for thread messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Messages of one idea, oldest first.
    async fn list_messages(&self, idea_id: IdeaId) -> DomainResult<Vec<Message>>;

    /// Appends a message. Returns the inserted rows.
    async fn insert_message(&self, message: NewMessage) -> DomainResult<Vec<Message>>;
}

/// Row-level change notifications from the store.
///
/// Delivery is best-effort: a subscriber that falls behind misses events and
/// nothing is replayed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, StoreChange>;
}

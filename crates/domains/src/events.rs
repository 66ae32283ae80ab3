//! # Change Events
//!
//! Row-level change notifications emitted by the store and fanned out to
//! subscribers. The same types are decoded again on the client side, so the
//! wire form is the serde form below.

use serde::{Deserialize, Serialize};

use crate::models::{Idea, Message};

/// One row-level change on a table holding `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent<T> {
    Insert { new: T },
    Update { new: T },
    /// Carries the row as it was before removal.
    Delete { old: T },
}

impl<T> ChangeEvent<T> {
    /// Operation name, also used as the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Insert { .. } => "insert",
            ChangeEvent::Update { .. } => "update",
            ChangeEvent::Delete { .. } => "delete",
        }
    }

    /// The row the event is about (new row for insert/update, old for delete).
    pub fn record(&self) -> &T {
        match self {
            ChangeEvent::Insert { new } | ChangeEvent::Update { new } => new,
            ChangeEvent::Delete { old } => old,
        }
    }
}

/// A change on either table, as published by a [`crate::ChangeFeed`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Idea(ChangeEvent<Idea>),
    Message(ChangeEvent<Message>),
}

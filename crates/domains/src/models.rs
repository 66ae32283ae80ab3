//! # Domain Models
//!
//! These structs represent the core entities of the idea board.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Server-assigned identifier of an [`Idea`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaId(pub Uuid);

impl IdeaId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for IdeaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IdeaId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::Validation(format!("Invalid idea id: {s}")))
    }
}

/// Server-assigned identifier of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The closed set of board columns an idea can live in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Working,
    Closed,
    Future,
}

impl Category {
    /// Column order on the board.
    pub const ALL: [Category; 3] = [Category::Working, Category::Closed, Category::Future];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Working => "working",
            Category::Closed => "closed",
            Category::Future => "future",
        }
    }

    /// Column heading shown on the board.
    pub fn title(self) -> &'static str {
        match self {
            Category::Working => "Idea Working",
            Category::Closed => "Idea Closed",
            Category::Future => "Idea for Future",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(Category::Working),
            "closed" => Ok(Category::Closed),
            "future" => Ok(Category::Future),
            _ => Err(DomainError::Validation("Invalid category".to_string())),
        }
    }
}

/// A user-created unit of work/discussion, shown as a card on the board.
///
/// Deserializing checks the same invariants the store enforces, so a row
/// that arrives over the wire is as trustworthy as one read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IdeaRecord")]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    /// Maintained by the store whenever messages are added or removed.
    pub message_count: i32,
}

/// A single entry in an idea's discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord")]
pub struct Message {
    pub id: MessageId,
    pub idea_id: IdeaId,
    pub text: String,
    /// Free-text display name; `None` renders as "Guest".
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct IdeaRecord {
    id: IdeaId,
    title: String,
    description: Option<String>,
    category: Category,
    created_at: DateTime<Utc>,
    message_count: i32,
}

impl TryFrom<IdeaRecord> for Idea {
    type Error = DomainError;

    fn try_from(row: IdeaRecord) -> Result<Self, Self::Error> {
        if row.title.trim().is_empty() {
            return Err(DomainError::Validation("Title is required".to_string()));
        }
        if row.message_count < 0 {
            return Err(DomainError::Validation(format!(
                "message_count cannot be negative, got {}",
                row.message_count
            )));
        }
        Ok(Idea {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            created_at: row.created_at,
            message_count: row.message_count,
        })
    }
}

#[derive(Deserialize)]
struct MessageRecord {
    id: MessageId,
    idea_id: IdeaId,
    text: String,
    author_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = DomainError;

    fn try_from(row: MessageRecord) -> Result<Self, Self::Error> {
        if row.text.trim().is_empty() {
            return Err(DomainError::Validation("text is required".to_string()));
        }
        Ok(Message {
            id: row.id,
            idea_id: row.idea_id,
            text: row.text,
            author_name: row.author_name,
            created_at: row.created_at,
        })
    }
}

/// Validated input for inserting an idea. Built by the service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdea {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
}

/// Validated input for appending a message to a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub idea_id: IdeaId,
    pub text: String,
    pub author_name: Option<String>,
}

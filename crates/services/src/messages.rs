//! Thread operations: validation in front of the [`MessageRepository`] port.

use std::sync::Arc;

use domains::{DomainError, DomainResult, IdeaId, Message, MessageRepository, NewMessage};

/// Raw post request as it arrives at the edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostMessageInput {
    pub idea_id: Option<String>,
    pub text: Option<String>,
    pub author_name: Option<String>,
}

pub struct MessageService {
    repo: Arc<dyn MessageRepository>,
}

impl MessageService {
    pub fn new(repo: Arc<dyn MessageRepository>) -> Self {
        Self { repo }
    }

    /// The thread of one idea in chronological order.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, idea_id: Option<&str>) -> DomainResult<Vec<Message>> {
        let idea_id = require_idea_id(idea_id)?;
        self.repo.list_messages(idea_id).await
    }

    /// Appends a message. Returns the inserted rows.
    #[tracing::instrument(skip(self, input))]
    pub async fn post(&self, input: PostMessageInput) -> DomainResult<Vec<Message>> {
        let idea_id = require_idea_id(input.idea_id.as_deref())?;
        let text = input.text.as_deref().unwrap_or_default().trim();
        if text.is_empty() {
            return Err(DomainError::Validation("text is required".to_string()));
        }
        let author_name = input
            .author_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let inserted = self
            .repo
            .insert_message(NewMessage {
                idea_id,
                text: text.to_string(),
                author_name,
            })
            .await?;
        tracing::info!(idea_id = %idea_id, "message posted");
        Ok(inserted)
    }
}

/// A thread is always addressed by its idea; absent or blank ids are rejected.
pub(crate) fn require_idea_id(raw: Option<&str>) -> DomainResult<IdeaId> {
    match raw.map(str::trim) {
        None | Some("") => Err(DomainError::Validation("idea_id is required".to_string())),
        Some(raw) => raw.parse(),
    }
}

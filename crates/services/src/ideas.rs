//! Idea operations: validation in front of the [`IdeaRepository`] port.

use std::sync::Arc;

use domains::{Category, DomainError, DomainResult, Idea, IdeaId, IdeaRepository, NewIdea};

/// Raw create request as it arrives at the edge. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIdeaInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

pub struct IdeaService {
    repo: Arc<dyn IdeaRepository>,
}

impl IdeaService {
    pub fn new(repo: Arc<dyn IdeaRepository>) -> Self {
        Self { repo }
    }

    /// All ideas, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> DomainResult<Vec<Idea>> {
        self.repo.list_ideas().await
    }

    /// Validates and persists a new idea.
    ///
    /// The title is trimmed and must be non-empty, a blank description is
    /// stored as absent, and a missing category means `working`.
    #[tracing::instrument(skip(self, input))]
    pub async fn create(&self, input: CreateIdeaInput) -> DomainResult<Idea> {
        let new = validate_new_idea(input)?;
        let idea = self.repo.insert_idea(new).await?;
        tracing::info!(idea_id = %idea.id, category = %idea.category, "idea created");
        Ok(idea)
    }

    /// Moves an idea to another column. The only supported mutation.
    #[tracing::instrument(skip(self))]
    pub async fn update_category(&self, id: &str, category: Option<&str>) -> DomainResult<()> {
        let category: Category = category.unwrap_or_default().parse()?;
        let id: IdeaId = id.parse()?;
        self.repo.update_category(id, category).await?;
        tracing::info!(idea_id = %id, category = %category, "idea moved");
        Ok(())
    }

    /// Deletes an idea. Deleting an absent id is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> DomainResult<()> {
        let id: IdeaId = id.parse()?;
        self.repo.delete_idea(id).await?;
        tracing::info!(idea_id = %id, "idea deleted");
        Ok(())
    }
}

fn validate_new_idea(input: CreateIdeaInput) -> DomainResult<NewIdea> {
    let title = input.title.as_deref().unwrap_or_default().trim();
    if title.is_empty() {
        return Err(DomainError::Validation("Title is required".to_string()));
    }
    let category = match input.category.as_deref() {
        None => Category::default(),
        Some(raw) => raw.parse()?,
    };
    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(NewIdea {
        title: title.to_string(),
        description,
        category,
    })
}

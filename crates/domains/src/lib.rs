//! crates/domains/src/lib.rs
//!
//! The central domain types and port definitions for the idea board.

pub mod error;
pub mod events;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use events::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn category_accepts_only_the_three_columns() {
        assert_eq!("working".parse::<Category>().unwrap(), Category::Working);
        assert_eq!("closed".parse::<Category>().unwrap(), Category::Closed);
        assert_eq!("future".parse::<Category>().unwrap(), Category::Future);

        let err = "archived".parse::<Category>().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.message(), "Invalid category");
        assert!("Working".parse::<Category>().is_err());
    }

    #[test]
    fn idea_serializes_with_store_column_names() {
        let idea = Idea {
            id: IdeaId::new(),
            title: "Widget".into(),
            description: None,
            category: Category::Working,
            created_at: chrono::Utc::now(),
            message_count: 3,
        };
        let json = serde_json::to_value(&idea).unwrap();
        assert_eq!(json["category"], "working");
        assert_eq!(json["message_count"], 3);
        assert!(json["description"].is_null());
        assert_eq!(json["id"], idea.id.to_string());
    }

    #[test]
    fn malformed_idea_id_is_a_validation_error() {
        assert!("not-a-uuid".parse::<IdeaId>().unwrap_err().is_validation());
    }
}

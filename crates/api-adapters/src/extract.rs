//! Request body helpers.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde_json::Value;

/// A JSON body that never rejects. Missing, malformed or non-JSON bodies are
/// read as `null`, so every field looks absent and the usual validation
/// message is returned instead of an extractor error.
#[derive(Debug, Clone)]
pub struct LenientJson(pub Value);

impl<S> FromRequest<S> for LenientJson
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = match Bytes::from_request(req, state).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or(Value::Null),
            Err(_) => Value::Null,
        };
        Ok(Self(value))
    }
}

impl LenientJson {
    /// A field as text, `None` when absent or null. Non-string values are read
    /// as their JSON text, so `"category": 3` fails validation like any other
    /// unknown category.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_read_as_text() {
        let body = LenientJson(json!({"title": "Widget", "category": 3, "description": null}));
        assert_eq!(body.string("title").as_deref(), Some("Widget"));
        assert_eq!(body.string("category").as_deref(), Some("3"));
        assert_eq!(body.string("description"), None);
        assert_eq!(LenientJson(Value::Null).string("title"), None);
    }
}

use thiserror::Error;

/// Failures seen by the client half of the board.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API could not be reached or the connection broke.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with an `{error}` body.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A response or realtime payload did not decode into the expected type.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A realtime frame whose `event:` name disagrees with its payload.
    #[error("realtime frame `{event}` carried a `{payload}` payload")]
    EventMismatch { event: String, payload: &'static str },

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status of an API rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

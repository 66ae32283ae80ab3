//! The HTTP API as seen from the client.

use async_trait::async_trait;
use domains::{Category, ChangeEvent, Idea, IdeaId, Message};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::board::IdeaDraft;
use crate::error::ClientError;
use crate::sse::{SseDecoder, Subscription};

/// Buffered realtime changes per subscription before the reader waits.
const CHANNEL_BUFFER: usize = 64;

/// Everything the board and thread views need from the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_ideas(&self) -> Result<Vec<Idea>, ClientError>;

    async fn create_idea(&self, draft: IdeaDraft) -> Result<Idea, ClientError>;

    async fn update_category(&self, id: IdeaId, category: Category) -> Result<(), ClientError>;

    async fn delete_idea(&self, id: IdeaId) -> Result<(), ClientError>;

    async fn list_messages(&self, idea_id: IdeaId) -> Result<Vec<Message>, ClientError>;

    /// Returns the inserted rows.
    async fn post_message(
        &self,
        idea_id: IdeaId,
        text: String,
        author_name: Option<String>,
    ) -> Result<Vec<Message>, ClientError>;

    /// Opens the board channel: every change on the ideas table.
    async fn subscribe_board(&self) -> Result<Subscription<Idea>, ClientError>;

    /// Opens the thread channel of one idea.
    async fn subscribe_thread(&self, idea_id: IdeaId) -> Result<Subscription<Message>, ClientError>;
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct CreateIdeaBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    category: Category,
}

#[derive(Serialize)]
struct MoveBody {
    category: Category,
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    idea_id: IdeaId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<&'a str>,
}

/// [`BoardApi`] over HTTP with reqwest. Realtime channels are SSE streams.
#[derive(Debug, Clone)]
pub struct HttpBoardApi {
    client: Client,
    base: String,
}

impl HttpBoardApi {
    /// `base_url` is where the API is mounted, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let parsed =
            Url::parse(base_url).map_err(|err| ClientError::InvalidUrl(format!("{base_url}: {err}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn subscribe<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Subscription<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let (tx, rx) = mpsc::channel::<ChangeEvent<T>>(CHANNEL_BUFFER);
        let channel = path.to_string();
        let task = tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        tracing::warn!(%channel, error = %err, "realtime connection lost");
                        return;
                    }
                };
                for frame in decoder.push(&chunk) {
                    match frame.decode::<T>() {
                        Ok(change) => {
                            if tx.send(change).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(%channel, error = %err, "dropping realtime frame")
                        }
                    }
                }
            }
            tracing::debug!(%channel, "realtime channel closed by server");
        });
        Ok(Subscription::with_task(rx, task))
    }
}

/// Turns non-2xx responses into [`ClientError::Api`] using the `{error}` body.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    let body: Data<T> = serde_json::from_slice(&bytes)?;
    Ok(body.data)
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_ideas(&self) -> Result<Vec<Idea>, ClientError> {
        let response = self.client.get(self.url("ideas")).send().await?;
        read_data(response).await
    }

    async fn create_idea(&self, draft: IdeaDraft) -> Result<Idea, ClientError> {
        let body = CreateIdeaBody {
            title: &draft.title,
            description: draft.description.as_deref(),
            category: draft.category,
        };
        let response = self
            .client
            .post(self.url("ideas"))
            .json(&body)
            .send()
            .await?;
        read_data(response).await
    }

    async fn update_category(&self, id: IdeaId, category: Category) -> Result<(), ClientError> {
        let response = self
            .client
            .patch(self.url(&format!("ideas/{id}")))
            .json(&MoveBody { category })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    async fn delete_idea(&self, id: IdeaId) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("ideas/{id}")))
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    async fn list_messages(&self, idea_id: IdeaId) -> Result<Vec<Message>, ClientError> {
        let response = self
            .client
            .get(self.url("messages"))
            .query(&[("idea_id", idea_id.to_string())])
            .send()
            .await?;
        read_data(response).await
    }

    async fn post_message(
        &self,
        idea_id: IdeaId,
        text: String,
        author_name: Option<String>,
    ) -> Result<Vec<Message>, ClientError> {
        let body = PostMessageBody {
            idea_id,
            text: &text,
            author_name: author_name.as_deref(),
        };
        let response = self
            .client
            .post(self.url("messages"))
            .json(&body)
            .send()
            .await?;
        read_data(response).await
    }

    async fn subscribe_board(&self) -> Result<Subscription<Idea>, ClientError> {
        self.subscribe("realtime/ideas", &[]).await
    }

    async fn subscribe_thread(&self, idea_id: IdeaId) -> Result<Subscription<Message>, ClientError> {
        self.subscribe("realtime/messages", &[("idea_id", idea_id.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let api = HttpBoardApi::new("http://localhost:8080/api/").unwrap();
        assert_eq!(api.url("ideas"), "http://localhost:8080/api/ideas");
    }

    #[test]
    fn relative_base_url_is_rejected() {
        assert!(matches!(
            HttpBoardApi::new("/api"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn create_body_omits_missing_description() {
        let body = CreateIdeaBody {
            title: "Widget",
            description: None,
            category: Category::Future,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"title": "Widget", "category": "future"})
        );
    }
}

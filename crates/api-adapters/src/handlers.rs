//! # Handlers
//!
//! This module coordinates the flow between HTTP requests and the services.
//! Every success body is either `{data: ...}` or `{ok: true}`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use domains::{ChangeFeed, Idea, IdeaRepository, Message, MessageRepository};
use serde::{Deserialize, Serialize};
use services::{CreateIdeaInput, IdeaService, MessageService, PostMessageInput, RealtimeService};

use crate::error::ApiError;
use crate::extract::LenientJson;
use crate::metrics::Metrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub ideas: Arc<IdeaService>,
    pub messages: Arc<MessageService>,
    pub realtime: Arc<RealtimeService>,
    pub metrics: Arc<Metrics>,
    pub keep_alive: Duration,
}

impl AppState {
    /// Wires every service to one store handle.
    pub fn new<S>(store: Arc<S>, keep_alive: Duration) -> Self
    where
        S: IdeaRepository + MessageRepository + ChangeFeed + 'static,
    {
        Self {
            ideas: Arc::new(IdeaService::new(store.clone())),
            messages: Arc::new(MessageService::new(store.clone())),
            realtime: Arc::new(RealtimeService::new(store)),
            metrics: Arc::new(Metrics::new()),
            keep_alive,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

const ACK: Ack = Ack { ok: true };

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub idea_id: Option<String>,
}

/// `GET /ideas`
pub async fn list_ideas(State(state): State<AppState>) -> Result<Json<Data<Vec<Idea>>>, ApiError> {
    let data = state.ideas.list().await?;
    Ok(Json(Data { data }))
}

/// `POST /ideas`
pub async fn create_idea(
    State(state): State<AppState>,
    body: LenientJson,
) -> Result<Json<Data<Idea>>, ApiError> {
    let input = CreateIdeaInput {
        title: body.string("title"),
        description: body.string("description"),
        category: body.string("category"),
    };
    let data = state.ideas.create(input).await?;
    state.metrics.ideas_created.inc();
    Ok(Json(Data { data }))
}

/// `PATCH /ideas/{id}`
pub async fn update_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: LenientJson,
) -> Result<Json<Ack>, ApiError> {
    state
        .ideas
        .update_category(&id, body.string("category").as_deref())
        .await?;
    state.metrics.ideas_moved.inc();
    Ok(Json(ACK))
}

/// `DELETE /ideas/{id}`
pub async fn delete_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    state.ideas.delete(&id).await?;
    state.metrics.ideas_deleted.inc();
    Ok(Json(ACK))
}

/// `GET /messages?idea_id=`
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Data<Vec<Message>>>, ApiError> {
    let data = state.messages.list(query.idea_id.as_deref()).await?;
    Ok(Json(Data { data }))
}

/// `POST /messages`. Responds with the inserted rows as an array.
pub async fn post_message(
    State(state): State<AppState>,
    body: LenientJson,
) -> Result<Json<Data<Vec<Message>>>, ApiError> {
    let input = PostMessageInput {
        idea_id: body.string("idea_id"),
        text: body.string("text"),
        author_name: body.string("author_name"),
    };
    let data = state.messages.post(input).await?;
    state.metrics.messages_posted.inc();
    Ok(Json(Data { data }))
}

/// `GET /healthz`
pub async fn health() -> Json<Ack> {
    Json(ACK)
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "metrics encoding failed");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

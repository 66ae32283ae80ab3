//! # Postgres store
//!
//! This module implements the data mapping between the Postgres relational
//! model and the domain models, plus the `LISTEN/NOTIFY` bridge that turns
//! the triggers in `migrations/` into a [`ChangeFeed`].

use std::time::Duration;

use async_trait::async_trait;
use domains::{
    Category, ChangeEvent, ChangeFeed, DomainError, DomainResult, Idea, IdeaId, IdeaRepository,
    Message, MessageId, MessageRepository, NewIdea, NewMessage, StoreChange,
};
use futures::stream::BoxStream;
use sqlx::postgres::{PgListener, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::task::JoinHandle;

use crate::feed::ChangeHub;

/// Channel the row triggers notify on.
pub const CHANGE_CHANNEL: &str = "board_changes";

const IDEA_COLUMNS: &str = "id, title, description, category, created_at, message_count";
const MESSAGE_COLUMNS: &str = "id, idea_id, text, author_name, created_at";

pub struct PgStore {
    pool: PgPool,
    hub: ChangeHub,
}

fn store_err(err: sqlx::Error) -> DomainError {
    DomainError::Store(err.to_string())
}

fn idea_from_row(row: &PgRow) -> DomainResult<Idea> {
    let category: String = row.try_get("category").map_err(store_err)?;
    Ok(Idea {
        id: IdeaId(row.try_get("id").map_err(store_err)?),
        title: row.try_get("title").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        category: category
            .parse()
            .map_err(|_| DomainError::Store(format!("unknown category in store: {category}")))?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        message_count: row.try_get("message_count").map_err(store_err)?,
    })
}

fn message_from_row(row: &PgRow) -> DomainResult<Message> {
    Ok(Message {
        id: MessageId(row.try_get("id").map_err(store_err)?),
        idea_id: IdeaId(row.try_get("idea_id").map_err(store_err)?),
        text: row.try_get("text").map_err(store_err)?,
        author_name: row.try_get("author_name").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

/// What a `pg_notify` payload from `notify_board_change()` carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The row travelled with the notification.
    Change(StoreChange),
    /// The row was too large for a notification; only its id was sent.
    Oversized(RowRef),
}

/// An inserted or updated row that has to be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    Idea { id: IdeaId, updated: bool },
    Message { id: MessageId, updated: bool },
}

/// Decodes one `pg_notify` payload produced by `notify_board_change()`.
pub fn decode_notification(payload: &str) -> Result<Notification, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    let table = value.get("table").and_then(|t| t.as_str()).unwrap_or_default();
    if let Some(id) = value.get("id") {
        let updated = value.get("type").and_then(|t| t.as_str()) == Some("update");
        let row = match table {
            "messages" => RowRef::Message {
                id: serde_json::from_value(id.clone())?,
                updated,
            },
            _ => RowRef::Idea {
                id: serde_json::from_value(id.clone())?,
                updated,
            },
        };
        return Ok(Notification::Oversized(row));
    }
    let change = match table {
        "messages" => StoreChange::Message(serde_json::from_value::<ChangeEvent<Message>>(value)?),
        _ => StoreChange::Idea(serde_json::from_value::<ChangeEvent<Idea>>(value)?),
    };
    Ok(Notification::Change(change))
}

/// Reads back a row announced by id. `None` when it is already gone; its
/// delete notification follows.
async fn read_back(pool: &PgPool, row: RowRef) -> DomainResult<Option<StoreChange>> {
    fn event<T>(new: T, updated: bool) -> ChangeEvent<T> {
        if updated {
            ChangeEvent::Update { new }
        } else {
            ChangeEvent::Insert { new }
        }
    }

    match row {
        RowRef::Idea { id, updated } => {
            let found = sqlx::query(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(pool)
                .await
                .map_err(store_err)?;
            match found {
                Some(row) => Ok(Some(StoreChange::Idea(event(idea_from_row(&row)?, updated)))),
                None => Ok(None),
            }
        }
        RowRef::Message { id, updated } => {
            let found =
                sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
                    .bind(id.0)
                    .fetch_optional(pool)
                    .await
                    .map_err(store_err)?;
            match found {
                Some(row) => Ok(Some(StoreChange::Message(event(
                    message_from_row(&row)?,
                    updated,
                )))),
                None => Ok(None),
            }
        }
    }
}

impl PgStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        channel_capacity: usize,
    ) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(store_err)?;
        Ok(Self::from_pool(pool, channel_capacity))
    }

    pub fn from_pool(pool: PgPool, channel_capacity: usize) -> Self {
        Self {
            pool,
            hub: ChangeHub::new(channel_capacity),
        }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Store(e.to_string()))
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Forwards trigger notifications into the change hub until the task is
    /// aborted. Notifications sent while the listener is reconnecting are lost.
    pub fn spawn_change_listener(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let hub = self.hub.clone();
        tokio::spawn(async move {
            let mut listener = match PgListener::connect_with(&pool).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!(error = %err, "could not open change listener");
                    return;
                }
            };
            if let Err(err) = listener.listen(CHANGE_CHANNEL).await {
                tracing::error!(error = %err, channel = CHANGE_CHANNEL, "LISTEN failed");
                return;
            }
            tracing::info!(channel = CHANGE_CHANNEL, "listening for row changes");

            loop {
                match listener.recv().await {
                    Ok(notification) => match decode_notification(notification.payload()) {
                        Ok(Notification::Change(change)) => hub.publish(change),
                        Ok(Notification::Oversized(row)) => match read_back(&pool, row).await {
                            Ok(Some(change)) => hub.publish(change),
                            Ok(None) => tracing::debug!(?row, "announced row is already gone"),
                            Err(err) => {
                                tracing::warn!(?row, error = %err, "could not read back changed row")
                            }
                        },
                        Err(err) => {
                            tracing::warn!(error = %err, "dropping undecodable change payload")
                        }
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "change listener lost its connection");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl IdeaRepository for PgStore {
    async fn list_ideas(&self) -> DomainResult<Vec<Idea>> {
        let rows = sqlx::query(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(idea_from_row).collect()
    }

    async fn insert_idea(&self, idea: NewIdea) -> DomainResult<Idea> {
        let row = sqlx::query(&format!(
            "INSERT INTO ideas (id, title, description, category) VALUES ($1, $2, $3, $4) \
             RETURNING {IDEA_COLUMNS}"
        ))
        .bind(IdeaId::new().0)
        .bind(idea.title)
        .bind(idea.description)
        .bind(idea.category.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        idea_from_row(&row)
    }

    async fn update_category(&self, id: IdeaId, category: Category) -> DomainResult<()> {
        sqlx::query("UPDATE ideas SET category = $1 WHERE id = $2")
            .bind(category.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_idea(&self, id: IdeaId) -> DomainResult<()> {
        sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for PgStore {
    async fn list_messages(&self, idea_id: IdeaId) -> DomainResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE idea_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(idea_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(message_from_row).collect()
    }

    async fn insert_message(&self, message: NewMessage) -> DomainResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "INSERT INTO messages (id, idea_id, text, author_name) VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(MessageId::new().0)
        .bind(message.idea_id.0)
        .bind(message.text)
        .bind(message.author_name)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(message_from_row).collect()
    }
}

impl ChangeFeed for PgStore {
    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        self.hub.subscribe()
    }
}

//! Channel scoping on top of the store's change feed.
//!
//! The board channel sees every idea change; a thread channel sees message
//! changes for exactly one idea.

use std::sync::Arc;

use domains::{ChangeEvent, ChangeFeed, DomainResult, Idea, IdeaId, Message, StoreChange};
use futures::future;
use futures::stream::{BoxStream, StreamExt};

use crate::messages::require_idea_id;

pub struct RealtimeService {
    feed: Arc<dyn ChangeFeed>,
}

impl RealtimeService {
    pub fn new(feed: Arc<dyn ChangeFeed>) -> Self {
        Self { feed }
    }

    pub fn board_channel(&self) -> BoxStream<'static, ChangeEvent<Idea>> {
        self.feed
            .subscribe()
            .filter_map(|change| {
                future::ready(match change {
                    StoreChange::Idea(event) => Some(event),
                    StoreChange::Message(_) => None,
                })
            })
            .boxed()
    }

    pub fn thread_channel(
        &self,
        idea_id: Option<&str>,
    ) -> DomainResult<BoxStream<'static, ChangeEvent<Message>>> {
        let idea_id: IdeaId = require_idea_id(idea_id)?;
        tracing::debug!(%idea_id, "thread channel opened");
        Ok(self
            .feed
            .subscribe()
            .filter_map(move |change| {
                future::ready(match change {
                    StoreChange::Message(event) if event.record().idea_id == idea_id => Some(event),
                    _ => None,
                })
            })
            .boxed())
    }
}

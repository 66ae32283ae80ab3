//! # In-memory store
//!
//! Keeps both tables in process and behaves like the relational store the
//! board is normally deployed against: it assigns ids and timestamps, owns
//! `message_count`, cascades idea deletes to their threads, enforces the
//! message → idea reference, and publishes a row-level change for every write.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{
    Category, ChangeEvent, ChangeFeed, DomainError, DomainResult, Idea, IdeaId, IdeaRepository,
    Message, MessageId, MessageRepository, NewIdea, NewMessage, StoreChange,
};
use futures::stream::BoxStream;

use crate::feed::ChangeHub;

pub struct MemoryStore {
    ideas: DashMap<IdeaId, Idea>,
    messages: DashMap<MessageId, Message>,
    hub: ChangeHub,
}

impl MemoryStore {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            ideas: DashMap::new(),
            messages: DashMap::new(),
            hub: ChangeHub::new(channel_capacity),
        }
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Removes a single message. Only reachable through direct store access;
    /// the HTTP surface never deletes messages.
    pub fn delete_message(&self, id: MessageId) {
        let Some((_, old)) = self.messages.remove(&id) else {
            return;
        };
        let idea = self.ideas.get_mut(&old.idea_id).map(|mut idea| {
            idea.message_count = (idea.message_count - 1).max(0);
            idea.clone()
        });
        self.hub.publish(StoreChange::Message(ChangeEvent::Delete { old }));
        if let Some(new) = idea {
            self.hub.publish(StoreChange::Idea(ChangeEvent::Update { new }));
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl IdeaRepository for MemoryStore {
    async fn list_ideas(&self) -> DomainResult<Vec<Idea>> {
        let mut ideas: Vec<Idea> = self.ideas.iter().map(|entry| entry.value().clone()).collect();
        ideas.sort_by_key(|idea| Reverse((idea.created_at, idea.id)));
        Ok(ideas)
    }

    async fn insert_idea(&self, idea: NewIdea) -> DomainResult<Idea> {
        let record = Idea {
            id: IdeaId::new(),
            title: idea.title,
            description: idea.description,
            category: idea.category,
            created_at: Utc::now(),
            message_count: 0,
        };
        self.ideas.insert(record.id, record.clone());
        self.hub
            .publish(StoreChange::Idea(ChangeEvent::Insert { new: record.clone() }));
        Ok(record)
    }

    async fn update_category(&self, id: IdeaId, category: Category) -> DomainResult<()> {
        let updated = self.ideas.get_mut(&id).map(|mut idea| {
            idea.category = category;
            idea.clone()
        });
        if let Some(new) = updated {
            self.hub.publish(StoreChange::Idea(ChangeEvent::Update { new }));
        }
        Ok(())
    }

    async fn delete_idea(&self, id: IdeaId) -> DomainResult<()> {
        let Some((_, old)) = self.ideas.remove(&id) else {
            return Ok(());
        };
        self.hub.publish(StoreChange::Idea(ChangeEvent::Delete { old }));

        let thread: Vec<MessageId> = self
            .messages
            .iter()
            .filter(|entry| entry.idea_id == id)
            .map(|entry| entry.id)
            .collect();
        for message_id in thread {
            if let Some((_, old)) = self.messages.remove(&message_id) {
                self.hub.publish(StoreChange::Message(ChangeEvent::Delete { old }));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn list_messages(&self, idea_id: IdeaId) -> DomainResult<Vec<Message>> {
        let mut thread: Vec<Message> = self
            .messages
            .iter()
            .filter(|entry| entry.idea_id == idea_id)
            .map(|entry| entry.value().clone())
            .collect();
        thread.sort_by_key(|message| (message.created_at, message.id));
        Ok(thread)
    }

    async fn insert_message(&self, message: NewMessage) -> DomainResult<Vec<Message>> {
        // Holding the idea entry keeps a concurrent delete from slipping in
        // between the reference check and the insert.
        let Some(mut idea) = self.ideas.get_mut(&message.idea_id) else {
            return Err(DomainError::Store(format!(
                "insert on table \"messages\" violates foreign key: idea {} does not exist",
                message.idea_id
            )));
        };
        let record = Message {
            id: MessageId::new(),
            idea_id: message.idea_id,
            text: message.text,
            author_name: message.author_name,
            created_at: Utc::now(),
        };
        self.messages.insert(record.id, record.clone());
        idea.message_count += 1;
        let snapshot = idea.clone();
        drop(idea);

        self.hub
            .publish(StoreChange::Message(ChangeEvent::Insert { new: record.clone() }));
        self.hub.publish(StoreChange::Idea(ChangeEvent::Update { new: snapshot }));
        Ok(vec![record])
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self) -> BoxStream<'static, StoreChange> {
        self.hub.subscribe()
    }
}

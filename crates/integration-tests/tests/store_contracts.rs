//! Behaviour every store backend must share.
//!
//! The in-memory store always runs. The Postgres store runs when
//! `TEST_DATABASE_URL` points at a scratch database.

use std::time::Duration;

use domains::{
    Category, ChangeEvent, ChangeFeed, IdeaId, IdeaRepository, MessageRepository, NewIdea,
    NewMessage, StoreChange,
};
use futures::StreamExt;
use storage_adapters::{MemoryStore, PgStore};

fn new_idea(title: &str) -> NewIdea {
    NewIdea {
        title: title.to_string(),
        description: None,
        category: Category::Working,
    }
}

async fn threads_and_cascades<S>(store: &S)
where
    S: IdeaRepository + MessageRepository,
{
    let idea = store.insert_idea(new_idea("Widget")).await.unwrap();
    assert_eq!(idea.message_count, 0);

    for text in ["one", "two"] {
        let rows = store
            .insert_message(NewMessage {
                idea_id: idea.id,
                text: text.to_string(),
                author_name: None,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    let thread = store.list_messages(idea.id).await.unwrap();
    let texts: Vec<&str> = thread.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["one", "two"]);

    let listed = store.list_ideas().await.unwrap();
    let stored = listed.iter().find(|i| i.id == idea.id).unwrap();
    assert_eq!(stored.message_count, 2);

    store.update_category(idea.id, Category::Closed).await.unwrap();
    let listed = store.list_ideas().await.unwrap();
    assert_eq!(
        listed.iter().find(|i| i.id == idea.id).unwrap().category,
        Category::Closed
    );

    store.delete_idea(idea.id).await.unwrap();
    store.delete_idea(idea.id).await.unwrap();
    assert!(store.list_messages(idea.id).await.unwrap().is_empty());
    assert!(store
        .list_ideas()
        .await
        .unwrap()
        .iter()
        .all(|i| i.id != idea.id));
}

async fn orphan_messages_are_refused<S: MessageRepository>(store: &S) {
    let err = store
        .insert_message(NewMessage {
            idea_id: domains::IdeaId::new(),
            text: "nobody home".to_string(),
            author_name: None,
        })
        .await
        .unwrap_err();
    assert!(!err.is_validation());
}

#[tokio::test]
async fn memory_store_contract() {
    let store = MemoryStore::default();
    threads_and_cascades(&store).await;
    orphan_messages_are_refused(&store).await;
}

#[tokio::test]
async fn memory_store_feed_orders_the_thread_then_the_count() {
    let store = MemoryStore::default();
    let mut changes = store.subscribe();
    let idea = store.insert_idea(new_idea("Widget")).await.unwrap();
    store
        .insert_message(NewMessage {
            idea_id: idea.id,
            text: "hello".to_string(),
            author_name: Some("Ada".to_string()),
        })
        .await
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let change = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap()
            .unwrap();
        seen.push(change);
    }
    assert!(matches!(&seen[0], StoreChange::Idea(ChangeEvent::Insert { .. })));
    assert!(matches!(&seen[1], StoreChange::Message(ChangeEvent::Insert { .. })));
    match &seen[2] {
        StoreChange::Idea(ChangeEvent::Update { new }) => assert_eq!(new.message_count, 1),
        other => panic!("expected the count update, got {other:?}"),
    }
}

/// Waits for the next change about `idea_id`, skipping anything else.
async fn next_about(
    changes: &mut (impl futures::Stream<Item = StoreChange> + Unpin),
    idea_id: IdeaId,
) -> StoreChange {
    loop {
        let change = tokio::time::timeout(Duration::from_secs(5), changes.next())
            .await
            .expect("no change within 5s")
            .expect("feed closed");
        let about = match &change {
            StoreChange::Idea(event) => event.record().id,
            StoreChange::Message(event) => event.record().idea_id,
        };
        if about == idea_id {
            return change;
        }
    }
}

async fn oversized_rows_are_stored_and_announced(store: &PgStore) {
    let mut changes = store.subscribe();
    let listener = store.spawn_change_listener();
    // LISTEN is issued by the spawned task.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let description = "d".repeat(10_000);
    let idea = store
        .insert_idea(NewIdea {
            title: "Long read".to_string(),
            description: Some(description.clone()),
            category: Category::Future,
        })
        .await
        .unwrap();
    match next_about(&mut changes, idea.id).await {
        StoreChange::Idea(ChangeEvent::Insert { new }) => {
            assert_eq!(new.description.as_deref(), Some(description.as_str()))
        }
        other => panic!("expected the idea insert, got {other:?}"),
    }

    let text = "t".repeat(9_000);
    store
        .insert_message(NewMessage {
            idea_id: idea.id,
            text: text.clone(),
            author_name: None,
        })
        .await
        .unwrap();
    match next_about(&mut changes, idea.id).await {
        StoreChange::Message(ChangeEvent::Insert { new }) => assert_eq!(new.text, text),
        other => panic!("expected the message insert first, got {other:?}"),
    }
    match next_about(&mut changes, idea.id).await {
        StoreChange::Idea(ChangeEvent::Update { new }) => assert_eq!(new.message_count, 1),
        other => panic!("expected the count update, got {other:?}"),
    }

    store.delete_idea(idea.id).await.unwrap();
    listener.abort();
}

#[tokio::test]
async fn postgres_store_contract() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres contract");
        return;
    };
    let store = PgStore::connect(&url, 2, 16).await.unwrap();
    store.migrate().await.unwrap();
    threads_and_cascades(&store).await;
    orphan_messages_are_refused(&store).await;
    oversized_rows_are_stored_and_announced(&store).await;
}

//! Shared harness for the cross-crate tests.

use std::time::Duration;

use board_client::{BoardSession, BoardView, CardKey};
use domains::{Category, IdeaId};

/// How long a test waits for realtime changes before giving up.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves a fresh in-memory board on an ephemeral port and returns the API
/// base url, e.g. `http://127.0.0.1:54321/api`.
#[cfg(feature = "web-axum")]
pub async fn spawn_board() -> std::io::Result<String> {
    use std::sync::Arc;

    use api_adapters::{router, AppState, RouterConfig};
    use storage_adapters::MemoryStore;

    let store = Arc::new(MemoryStore::default());
    let app = router(
        AppState::new(store, Duration::from_secs(1)),
        &RouterConfig::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

/// Pulls realtime changes into `session` until `done` holds.
///
/// # Panics
/// When the channels close or [`SETTLE_TIMEOUT`] passes first.
pub async fn settle(session: &mut BoardSession, mut done: impl FnMut(&BoardSession) -> bool) {
    let waited = tokio::time::timeout(SETTLE_TIMEOUT, async {
        while !done(session) {
            if session.next_event().await.is_none() {
                panic!("realtime channels closed before the session settled");
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for realtime changes");
}

/// How many times a card shows up across all columns.
pub fn occurrences(board: &BoardView, id: IdeaId) -> usize {
    Category::ALL
        .into_iter()
        .map(|c| {
            board
                .order(c)
                .iter()
                .filter(|k| **k == CardKey::Saved(id))
                .count()
        })
        .sum()
}

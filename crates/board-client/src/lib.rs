//! # board-client
//!
//! Client half of the idea board: a local board and thread model that applies
//! user actions optimistically, reconciles them with HTTP responses and the
//! realtime channels, and never shows a card twice.

pub mod api;
pub mod board;
pub mod error;
pub mod session;
pub mod sse;
pub mod thread;
pub mod txn;

pub use api::{BoardApi, HttpBoardApi};
pub use board::{BoardView, Card, CardKey, Column, DragOutcome, DropTarget, IdeaDraft, PendingMove};
pub use error::ClientError;
pub use session::{BoardSession, InFlight, Reply, SessionEvent};
pub use sse::{SseDecoder, SseFrame, Subscription};
pub use thread::{EntryKey, ThreadEntry, ThreadView, GUEST};
pub use txn::{Resolution, TxnId, TxnLog};

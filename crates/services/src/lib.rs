//! # services
//!
//! The sync layer: thin request/response operations that validate raw input
//! and translate it into store calls. No business logic beyond that.

pub mod ideas;
pub mod messages;
pub mod realtime;

pub use ideas::{CreateIdeaInput, IdeaService};
pub use messages::{MessageService, PostMessageInput};
pub use realtime::RealtimeService;

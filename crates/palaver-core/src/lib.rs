//! # palaver-core
//!
//! Core primitives for the Palaver chat-bot runtime: the process-safe
//! shared state store, the channels joining the runtime loops, the
//! weak-reference event dispatcher, and the error types shared by every
//! other crate in the workspace.

pub mod bot;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod logging;
pub mod state;

pub use bot::Bot;
pub use channel::{Channel, CommandRequest, RawItem, Received, Update};
pub use dispatch::{BUILTIN_EVENTS, Dispatcher, EventContext, EventHandler};
pub use error::{PalaverError, Result};
pub use event::{ChatAttachment, ChatEvent, ChatMessage, ChatPresence};
pub use logging::init_tracing;
pub use state::State;

//! # palaver-engine
//!
//! The runtime engine: three cooperating loops joined by channels,
//! orchestrated by a non-re-entrant lifecycle.
//!
//! ```text
//!   chat space ──► ears ──► Listener ──► inbox ──► Worker
//!                              │                      │
//!                              │ interactive          │ side effects
//!                              ▼                      ▼
//!                            Shell ──────────────► mouth ──► Speaker ──► chat space
//! ```
//!
//! Every loop polls the shared `general.switch` flag between channel
//! receives and also honors the engine's cancellation token and the
//! channel poison sentinel, so shutdown lands within one polling
//! interval whichever signal arrives first.

pub mod engine;
pub(crate) mod listener;
pub mod space;
pub(crate) mod speaker;
pub(crate) mod worker;

pub use engine::{Engine, Phase};
pub use space::{LocalSpace, Space};

//! # palaver-bus
//!
//! A topic-based publish/subscribe bus between independently running
//! engine instances.
//!
//! Two usage patterns, mirrored from the coordination design this bus
//! serves:
//!
//! 1. A coordinating instance broadcasts instructions to many satellite
//!    instances, each filtering on its own identity as topic.
//! 2. A coordinating instance observes state changes emitted by many
//!    satellites, each publishing under its own identity.
//!
//! The wire format is one text frame per message:
//! `"<topic><single space><canonical JSON payload>"`. Topics must not
//! contain the delimiter. Delivery is fire-and-forget — no acks, no
//! retry, no history: a subscriber created after a frame was sent will
//! never see it.

pub mod publisher;
pub mod subscriber;

use serde_json::json;

use palaver_core::{Result, State};

pub use publisher::Publisher;
pub use subscriber::Subscriber;

/// Focal point of bus exchanges on the network.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5555";

/// Facade tying publishers and subscribers to the shared `bus.address`
/// setting.
pub struct Bus {
    state: State,
}

impl Bus {
    pub fn new(state: State) -> Self {
        Self { state }
    }

    /// Seeds `bus.address` with the default endpoint when unset.
    pub fn check(&self) {
        self.state.ensure("bus.address", json!(DEFAULT_ADDRESS));
    }

    pub fn address(&self) -> String {
        self.state.get_str("bus.address", DEFAULT_ADDRESS)
    }

    /// Builds a publisher bound to `bus.address`. Call
    /// [`Publisher::bind`] to start broadcasting.
    pub fn publish(&self) -> Publisher {
        Publisher::new(self.state.clone())
    }

    /// Opens a filtered read endpoint on one or several topics.
    pub async fn subscribe(&self, topics: &[&str]) -> Result<Subscriber> {
        Subscriber::connect(&self.address(), topics).await
    }
}

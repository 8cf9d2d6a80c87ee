//! The chat-transport seam.
//!
//! The engine only ever consumes this narrow surface: a connect call, a
//! readiness flag, and a post operation. Real chat-platform clients
//! live outside this workspace; [`LocalSpace`] stands in for them in
//! tests and demos.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use palaver_core::{Result, Update};

/// A connector to one chat space.
#[async_trait]
pub trait Space: Send + Sync {
    /// Establishes the connection (webhook registration, auth, ...).
    async fn connect(&self) -> Result<()>;

    /// Posts one outbound update. Plain text goes out verbatim; rich
    /// updates are destructured by the implementation.
    async fn post_message(&self, update: &Update) -> Result<()>;

    /// Whether the space can accept posts right now. The speaker
    /// defers dequeuing while this reads false.
    fn is_ready(&self) -> bool;
}

/// In-process space that records everything posted to it.
#[derive(Default)]
pub struct LocalSpace {
    ready: AtomicBool,
    posts: Mutex<Vec<Update>>,
}

impl LocalSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Everything posted so far, in order.
    pub fn posts(&self) -> Vec<Update> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl Space for LocalSpace {
    async fn connect(&self) -> Result<()> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn post_message(&self, update: &Update) -> Result<()> {
        info!(text = update.text(), "posting");
        self.posts.lock().push(update.clone());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

//! Unbounded FIFO channels joining the runtime loops.
//!
//! Every channel carries domain payloads plus a poison sentinel that
//! tells the draining loop to terminate. Receivers poll with a short
//! timeout so the cooperative shutdown switch is re-checked at bounded
//! intervals instead of blocking forever.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::mpsc;

enum Sealed<T> {
    Item(T),
    Poison,
}

/// Outcome of a timed receive.
#[derive(Debug)]
pub enum Received<T> {
    /// A payload was dequeued.
    Item(T),
    /// The poison sentinel was read, or the channel was closed — the
    /// draining loop should terminate.
    Poison,
    /// Nothing arrived within the timeout.
    Empty,
}

/// An unbounded FIFO transport for one kind of payload.
///
/// Senders share the channel through an `Arc`; the single receiver side
/// lives behind an async mutex so exactly one loop drains it at a time.
pub struct Channel<T> {
    tx: mpsc::UnboundedSender<Sealed<T>>,
    rx: TokioMutex<mpsc::UnboundedReceiver<Sealed<T>>>,
    queued: AtomicUsize,
}

impl<T: Send> Channel<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: TokioMutex::new(rx),
            queued: AtomicUsize::new(0),
        }
    }

    /// Queues one payload. A send to a closed channel is silently
    /// dropped — the receiving loop has already terminated.
    pub fn put(&self, item: T) {
        if self.tx.send(Sealed::Item(item)).is_ok() {
            self.queued.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Queues the shutdown sentinel.
    pub fn poison(&self) {
        let _ = self.tx.send(Sealed::Poison);
    }

    /// Number of payloads queued and not yet dequeued.
    pub fn pending(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Waits until the next payload or the sentinel.
    pub async fn get(&self) -> Option<T> {
        match self.rx.lock().await.recv().await {
            Some(Sealed::Item(item)) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            }
            Some(Sealed::Poison) | None => None,
        }
    }

    /// Waits for the next payload up to `timeout`.
    pub async fn get_timeout(&self, timeout: Duration) -> Received<T> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(Sealed::Item(item))) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                Received::Item(item)
            }
            Ok(Some(Sealed::Poison)) | Ok(None) => Received::Poison,
            Err(_) => Received::Empty,
        }
    }
}

impl<T: Send> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Payload types ─────────────────────────────────────────────

/// An actionable command resolved by the listener and queued to the
/// worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub verb: String,
    pub arguments: String,
    /// The chat channel the command came from, when known.
    pub channel_id: Option<String>,
}

impl CommandRequest {
    pub fn new(verb: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            arguments: arguments.into(),
            channel_id: None,
        }
    }
}

/// An outbound update queued to the speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Update {
    /// Plain text, forwarded verbatim.
    Text(String),
    /// A structured update destructured into the transport's post call.
    Rich {
        text: String,
        /// Rendered content (e.g. markdown), when it differs from the text.
        content: Option<String>,
        /// Path or handle of an attached file.
        file: Option<String>,
    },
}

impl Update {
    pub fn text(&self) -> &str {
        match self {
            Update::Text(text) => text,
            Update::Rich { text, .. } => text,
        }
    }
}

impl From<&str> for Update {
    fn from(text: &str) -> Self {
        Update::Text(text.to_string())
    }
}

impl From<String> for Update {
    fn from(text: String) -> Self {
        Update::Text(text)
    }
}

/// The ears channel carries raw, not-yet-classified chat items.
pub type RawItem = Value;

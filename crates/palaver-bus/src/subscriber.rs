//! Receiving side of the bus.

use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use palaver_core::{PalaverError, Result};

/// A filtered read endpoint over one or several topics.
///
/// Filtering happens in the transport task: only frames whose leading
/// bytes prefix-match a registered topic are admitted to the local
/// queue, so [`Subscriber::get`] never sees foreign traffic. The topic
/// token is discarded during decoding — receivers needing
/// topic-dependent context must find it inside the payload itself.
pub struct Subscriber {
    queue: TokioMutex<mpsc::UnboundedReceiver<String>>,
    cancel: CancellationToken,
}

impl Subscriber {
    /// Connects to the publisher and starts the filtering read task.
    pub async fn connect(address: &str, topics: &[&str]) -> Result<Subscriber> {
        if topics.is_empty() || topics.iter().any(|topic| topic.is_empty()) {
            return Err(PalaverError::EmptyTopic);
        }
        debug!(address, ?topics, "subscribing");

        let stream = TcpStream::connect(address)
            .await
            .map_err(|error| PalaverError::Bus(format!("cannot reach {address}: {error}")))?;

        let filters: Vec<String> = topics.iter().map(|topic| topic.to_string()).collect();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let guard = cancel.clone();
        tokio::spawn(async move {
            let mut frames = FramedRead::new(stream, LinesCodec::new());
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    frame = frames.next() => match frame {
                        Some(Ok(line)) => {
                            if filters.iter().any(|topic| line.starts_with(topic.as_str())) {
                                let _ = tx.send(line);
                            }
                        }
                        Some(Err(error)) => {
                            warn!(%error, "bus frame error");
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(Subscriber {
            queue: TokioMutex::new(rx),
            cancel,
        })
    }

    /// Gets the next message.
    ///
    /// Non-blocking by default: returns `Ok(None)` when no message is
    /// currently available. With `block` set, waits until a message
    /// arrives — possibly forever, when nobody ever publishes on the
    /// subscribed topics. A blocking wait on a dead connection does not
    /// hang: once the transport task has ended, the call fails with
    /// [`PalaverError::Bus`] so the caller can reconnect.
    pub async fn get(&self, block: bool) -> Result<Option<Value>> {
        let mut queue = self.queue.lock().await;
        let frame = if block {
            match queue.recv().await {
                Some(frame) => frame,
                None => return Err(PalaverError::Bus("subscription closed".to_string())),
            }
        } else {
            match queue.try_recv() {
                Ok(frame) => frame,
                Err(_) => return Ok(None),
            }
        };
        Self::decode(&frame).map(Some)
    }

    fn decode(frame: &str) -> Result<Value> {
        let (_topic, text) = frame
            .split_once(' ')
            .ok_or_else(|| PalaverError::Bus(format!("frame without delimiter: {frame}")))?;
        Ok(serde_json::from_str(text)?)
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

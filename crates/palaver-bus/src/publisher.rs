//! Broadcasting side of the bus.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as TokioMutex;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use palaver_core::{Channel, PalaverError, Received, Result, State};

/// Grace period after binding, so subscribers created together with
/// the publisher can connect before the first frame goes out.
const DEFER_DURATION: Duration = Duration::from_millis(300);

/// Poll interval of the fan-out loop.
const FAN_TIMEOUT: Duration = Duration::from_millis(100);

type Connections = Arc<TokioMutex<Vec<FramedWrite<TcpStream, LinesCodec>>>>;

/// Broadcasts `(topic, message)` pairs to every connected subscriber.
///
/// [`Publisher::put`] only queues frames; a background fan-out task
/// transmits them. When the function returns there is no guarantee the
/// message has been transmitted, let alone received.
pub struct Publisher {
    state: State,
    fan: Arc<Channel<String>>,
    cancel: CancellationToken,
    bound: Option<SocketAddr>,
}

impl Publisher {
    pub fn new(state: State) -> Self {
        Self {
            state,
            fan: Arc::new(Channel::new()),
            cancel: CancellationToken::new(),
            bound: None,
        }
    }

    /// Binds the broadcast endpoint at `bus.address` and starts the
    /// accept and fan-out tasks. The actually bound address is written
    /// back to `bus.address`, so an ephemeral port (`:0`) becomes
    /// discoverable by subscribers of the same state store.
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let address = self
            .state
            .get_str("bus.address", crate::DEFAULT_ADDRESS);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|error| PalaverError::Bus(format!("cannot bind {address}: {error}")))?;
        let bound = listener.local_addr()?;
        self.state.set("bus.address", json!(bound.to_string()));
        self.bound = Some(bound);
        info!(address = %bound, "publishing");

        let connections: Connections = Arc::new(TokioMutex::new(Vec::new()));

        let accepting = connections.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "subscriber connected");
                            accepting
                                .lock()
                                .await
                                .push(FramedWrite::new(stream, LinesCodec::new()));
                        }
                        Err(error) => {
                            warn!(%error, "accept failed");
                            break;
                        }
                    },
                }
            }
        });

        let state = self.state.clone();
        let fan = self.fan.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEFER_DURATION).await;
            state.set("publisher.counter", json!(0));
            while state.switch_is_on() && !cancel.is_cancelled() {
                match fan.get_timeout(FAN_TIMEOUT).await {
                    Received::Item(frame) => {
                        state.increment("publisher.counter", 1);
                        debug!(%frame, "publishing frame");
                        Self::broadcast(&connections, frame).await;
                    }
                    Received::Poison => break,
                    Received::Empty => {}
                }
            }
            info!("publisher has been stopped");
        });

        Ok(bound)
    }

    async fn broadcast(connections: &Connections, frame: String) {
        let mut connections = connections.lock().await;
        let mut index = 0;
        while index < connections.len() {
            match connections[index].send(frame.clone()).await {
                Ok(()) => index += 1,
                Err(error) => {
                    debug!(%error, "dropping dead subscriber connection");
                    connections.swap_remove(index);
                }
            }
        }
    }

    /// Queues one message for broadcast on one or several topics.
    ///
    /// Topics must be non-empty and free of the frame delimiter; the
    /// message must be non-null and non-empty. One frame is emitted per
    /// topic.
    pub fn put(&self, topics: &[&str], message: &Value) -> Result<()> {
        if topics.is_empty() {
            return Err(PalaverError::EmptyTopic);
        }
        if message.is_null() || message.as_str().is_some_and(str::is_empty) {
            return Err(PalaverError::EmptyMessage);
        }

        let text = serde_json::to_string(message)?;
        for topic in topics {
            if topic.is_empty() {
                return Err(PalaverError::EmptyTopic);
            }
            if topic.contains(' ') {
                return Err(PalaverError::InvalidTopic(topic.to_string()));
            }
            debug!(%topic, "queuing frame");
            self.fan.put(format!("{topic} {text}"));
        }
        Ok(())
    }

    /// The address bound by [`Publisher::bind`], when started.
    pub fn bound_address(&self) -> Option<SocketAddr> {
        self.bound
    }

    /// Stops the fan-out and accept tasks. Queued frames not yet
    /// transmitted are lost, which is the bus's documented semantics.
    pub fn stop(&self) {
        self.fan.poison();
        self.cancel.cancel();
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

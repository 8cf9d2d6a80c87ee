//! The outbound loop: drains the mouth channel and forwards updates to
//! the chat space.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use palaver_core::{Channel, Received, State, Update};

use crate::space::Space;

/// Blocking timeout on each mouth pull.
const PULL_TIMEOUT: Duration = Duration::from_millis(100);

/// Back-off while the space reports not ready. Outbound items stay
/// queued during the wait.
const NOT_READY_DELAY: Duration = Duration::from_secs(1);

pub(crate) struct Speaker {
    pub state: State,
    pub mouth: Arc<Channel<Update>>,
    pub space: Arc<dyn Space>,
    pub cancel: CancellationToken,
}

impl Speaker {
    pub(crate) async fn run(self) {
        info!("starting speaker");
        self.state.set("speaker.counter", json!(0));

        // log the wait once per not-ready episode
        let mut wait_logged = false;

        while self.state.switch_is_on() && !self.cancel.is_cancelled() {
            if !self.space.is_ready() {
                if !wait_logged {
                    debug!("speaker is waiting for space to be ready...");
                    wait_logged = true;
                }
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(NOT_READY_DELAY) => {}
                }
                continue;
            }
            wait_logged = false;

            match self.mouth.get_timeout(PULL_TIMEOUT).await {
                Received::Item(update) => {
                    let counter = self.state.increment("speaker.counter", 1);
                    debug!(counter, "speaker is working");
                    if let Err(error) = self.space.post_message(&update).await {
                        warn!(%error, counter, "could not post update");
                    }
                }
                Received::Poison => break,
                Received::Empty => {}
            }
        }

        info!("speaker has been stopped");
    }
}

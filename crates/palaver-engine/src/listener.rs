//! The inbound loop: drains the ears channel, classifies items, and
//! hands actionable text to the shell.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use palaver_core::{
    Channel, ChatEvent, ChatMessage, Dispatcher, EventContext, RawItem, Received, Result, State,
};
use palaver_shell::Shell;

/// Sleep between polls of an empty ears channel.
const EMPTY_DELAY: Duration = Duration::from_millis(5);

/// How recently a downstream observer must have stamped in for
/// unaddressed input to be forwarded to the fan channel.
const FRESH_DURATION_MS: i64 = 500;

/// Handles events received from the chat space.
///
/// Addressing is string-prefix based on `bot.name` (ASCII
/// case-insensitive, one leading `@` or `/` sigil stripped first), so
/// bot names that are prefixes of each other can shadow one another.
pub(crate) struct Listener {
    pub state: State,
    pub ears: Arc<Channel<RawItem>>,
    pub shell: Arc<Shell>,
    pub dispatcher: Arc<Dispatcher>,
    /// Raw items are duplicated here before interpretation, when set.
    pub tee: Option<Arc<Channel<RawItem>>>,
    /// Unaddressed input goes here for downstream observers, when set.
    pub fan: Option<Arc<Channel<RawItem>>>,
    pub cancel: CancellationToken,
}

impl Listener {
    pub(crate) async fn run(self) {
        info!("starting listener");
        self.state.set("listener.counter", json!(0));

        while self.state.switch_is_on() && !self.cancel.is_cancelled() {
            match self.ears.get_timeout(EMPTY_DELAY).await {
                Received::Item(item) => {
                    if let Err(error) = self.process(item) {
                        warn!(%error, "invalid item, thrown away");
                    }
                }
                Received::Poison => break,
                Received::Empty => {}
            }
        }

        info!("listener has been stopped");
    }

    fn process(&self, item: RawItem) -> Result<()> {
        let counter = self.state.increment("listener.counter", 1);
        debug!(counter, "listener is working");

        if let Some(tee) = &self.tee {
            tee.put(item.clone());
        }

        match ChatEvent::from_value(item)? {
            ChatEvent::Message(message) => self.on_message(message),
            ChatEvent::Attachment(attachment) => {
                debug!("processing an 'attachment' event");
                self.dispatcher.dispatch(
                    "attachment",
                    &EventContext::with_received(ChatEvent::Attachment(attachment)),
                )
            }
            ChatEvent::Join(presence) => {
                debug!("processing a 'join' event");
                let own = presence.actor_id.as_deref()
                    == Some(self.state.get_str("bot.id", "").as_str());
                let event = if own { "enter" } else { "join" };
                self.dispatcher
                    .dispatch(event, &EventContext::with_received(ChatEvent::Join(presence)))
            }
            ChatEvent::Leave(presence) => {
                debug!("processing a 'leave' event");
                let own = presence.actor_id.as_deref()
                    == Some(self.state.get_str("bot.id", "").as_str());
                let event = if own { "exit" } else { "leave" };
                self.dispatcher.dispatch(
                    event,
                    &EventContext::with_received(ChatEvent::Leave(presence)),
                )
            }
            ChatEvent::Inbound(other) => {
                debug!("processing an inbound event");
                self.dispatcher.dispatch(
                    "inbound",
                    &EventContext::with_received(ChatEvent::Inbound(other)),
                )
            }
        }
    }

    fn on_message(&self, message: ChatMessage) -> Result<()> {
        self.dispatcher.dispatch(
            "message",
            &EventContext::with_received(ChatEvent::Message(message.clone())),
        )?;

        let bot_id = self.state.get_str("bot.id", "");
        if message.from_id.as_deref() == Some(bot_id.as_str()) {
            debug!("sent by me, thrown away");
            return Ok(());
        }

        let Some(text) = message.text.as_deref() else {
            debug!("no input in this item, thrown away");
            return Ok(());
        };

        let mut input = text.trim();
        if let Some(stripped) = input.strip_prefix(['@', '/']) {
            input = stripped;
        }

        let name = self.state.get_str("bot.name", "shelly");
        let addressed = input
            .get(..name.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&name));

        if addressed {
            debug!("bot name in command");
            input = input[name.len()..].trim_start();
        } else if message.mentioned_ids.iter().any(|id| *id == bot_id) {
            debug!("bot mentioned in command");
        } else {
            if let Some(fan) = &self.fan {
                let stamp = self
                    .state
                    .get("fan.stamp", json!(0))
                    .as_i64()
                    .unwrap_or(0);
                let elapsed = chrono::Utc::now().timestamp_millis() - stamp;
                if elapsed < FRESH_DURATION_MS {
                    fan.put(json!(input));
                }
            }
            info!("not for me, thrown away");
            return Ok(());
        }

        debug!("submitting command to the shell");
        self.shell.do_line(input, message.channel_id.clone())
    }
}

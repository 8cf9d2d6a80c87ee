//! The narrow surface handed to command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::channel::{Channel, Update};
use crate::state::State;

/// What a command handler gets to work with: a way to speak back into
/// the chat channel, and the shared state store.
#[derive(Clone)]
pub struct Bot {
    state: State,
    mouth: Arc<Channel<Update>>,
}

impl Bot {
    pub fn new(state: State, mouth: Arc<Channel<Update>>) -> Self {
        Self { state, mouth }
    }

    /// Queues one line of text for the chat channel. Empty text is
    /// silently ignored.
    pub fn say(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.mouth.put(Update::Text(text));
    }

    /// Queues a structured outbound update.
    pub fn say_update(&self, update: Update) {
        self.mouth.put(update);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The bot's own identity in the chat channel.
    pub fn id(&self) -> String {
        self.state.get_str("bot.id", "")
    }

    /// The name people address the bot by.
    pub fn name(&self) -> String {
        self.state.get_str("bot.name", "shelly")
    }

    /// Generates and stores an identity when none was configured.
    pub fn ensure_identity(&self) {
        self.state.ensure(
            "bot.id",
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        self.state
            .ensure("bot.name", Value::String("shelly".to_string()));
    }
}

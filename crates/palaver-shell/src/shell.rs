//! Verb registry and line dispatch.
//!
//! The shell resolves one line of text into a command plus residual
//! arguments. Interactive commands execute on the spot; the rest are
//! queued to the worker through the inbox channel. An unknown verb
//! falls back to the `*` wildcard command when one is loaded, and to a
//! short apology otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info};

use palaver_core::{Bot, Channel, CommandRequest, PalaverError, Result, State};

use crate::command::Command;

/// The wildcard verb used when no command matches.
pub const FALLBACK_VERB: &str = "*";

pub struct Shell {
    state: State,
    bot: Bot,
    inbox: Arc<Channel<CommandRequest>>,
    commands: RwLock<BTreeMap<String, Arc<dyn Command>>>,
}

impl Shell {
    pub fn new(state: State, bot: Bot, inbox: Arc<Channel<CommandRequest>>) -> Self {
        Self {
            state,
            bot,
            inbox,
            commands: RwLock::new(BTreeMap::new()),
        }
    }

    /// Binds one command to its keyword. A duplicate keyword is a
    /// fatal configuration error, caught eagerly at load time.
    pub fn load_command(&self, command: Arc<dyn Command>) -> Result<()> {
        let keyword = command.keyword().to_string();
        let mut commands = self.commands.write();
        if commands.contains_key(&keyword) {
            return Err(PalaverError::DuplicateCommand(keyword));
        }
        debug!(%keyword, "loading command");
        commands.insert(keyword, command);
        Ok(())
    }

    pub fn load_commands(&self, batch: Vec<Arc<dyn Command>>) -> Result<()> {
        for command in batch {
            self.load_command(command)?;
        }
        Ok(())
    }

    /// The sorted inventory of loaded verbs.
    pub fn commands(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }

    /// Looks one verb up, without fallback.
    pub fn command(&self, keyword: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(keyword).cloned()
    }

    /// Splits a line into its verb and residual arguments.
    pub fn parse(line: &str) -> (String, String) {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb.to_string(), rest.trim().to_string()),
            None => (line.to_string(), String::new()),
        }
    }

    /// Handles one line of text addressed to the bot.
    ///
    /// The first token is the verb. An unknown verb falls back to the
    /// `*` command, which receives the full line as arguments. A
    /// handler failure sends an apology to the user and then
    /// propagates, so the owning loop can surface it.
    pub fn do_line(&self, line: &str, channel_id: Option<String>) -> Result<()> {
        info!(line, "handling");
        self.state.increment("shell.counter", 1);
        self.state.set("shell.line", json!(line));

        let (verb, arguments) = Self::parse(line);

        if let Some(command) = self.command(&verb) {
            self.state.set("shell.verb", json!(verb));
            return self.run(command, &arguments, channel_id);
        }

        if let Some(fallback) = self.command(FALLBACK_VERB) {
            // the fallback gets the full line, verb included
            self.state.set("shell.verb", json!(FALLBACK_VERB));
            return self.run(fallback, line.trim(), channel_id);
        }

        self.bot
            .say(format!("Sorry, I do not know how to handle '{verb}'"));
        Ok(())
    }

    fn run(
        &self,
        command: Arc<dyn Command>,
        arguments: &str,
        channel_id: Option<String>,
    ) -> Result<()> {
        if command.is_interactive() {
            let verb = command.keyword().to_string();
            command.execute(&self.bot, arguments).map_err(|error| {
                self.bot
                    .say(format!("Sorry, I do not know how to handle '{verb}'"));
                error
            })
        } else {
            let mut request = CommandRequest::new(command.keyword(), arguments);
            request.channel_id = channel_id;
            self.inbox.put(request);
            Ok(())
        }
    }
}

//! The command loop: drains the inbox and executes non-interactive
//! commands.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use palaver_core::{Bot, Channel, CommandRequest, Received, Result, State};
use palaver_shell::{FALLBACK_VERB, Shell};

/// Blocking timeout on each inbox pull.
const PULL_TIMEOUT: Duration = Duration::from_millis(100);

/// Executes queued commands one at a time.
///
/// `worker.busy` reads true for the whole duration of a command
/// execution, so other components can choose between an immediate and
/// a deferred acknowledgment. A command that never returns blocks this
/// loop indefinitely — there is no hard cancel of an in-flight handler.
pub(crate) struct Worker {
    pub state: State,
    pub inbox: Arc<Channel<CommandRequest>>,
    pub shell: Arc<Shell>,
    pub bot: Bot,
    pub cancel: CancellationToken,
}

impl Worker {
    /// Runs until shutdown, or until a handler fault: the user gets an
    /// apology, but the fault itself propagates so the supervising side
    /// can crash or restart instead of silently degrading.
    pub(crate) async fn run(self) -> Result<()> {
        info!("starting worker");
        self.state.set("worker.counter", json!(0));
        self.state.set("worker.busy", json!(false));

        let outcome = loop {
            if !self.state.switch_is_on() || self.cancel.is_cancelled() {
                break Ok(());
            }
            match self.inbox.get_timeout(PULL_TIMEOUT).await {
                Received::Item(request) => {
                    let counter = self.state.increment("worker.counter", 1);
                    self.state.set("worker.busy", json!(true));
                    if let Err(error) = self.process(&request, counter) {
                        break Err(error);
                    }
                    self.state.set("worker.busy", json!(false));
                }
                Received::Poison => break Ok(()),
                Received::Empty => {}
            }
        };

        info!("worker has been stopped");
        outcome
    }

    fn process(&self, request: &CommandRequest, counter: i64) -> Result<()> {
        debug!(counter, verb = %request.verb, "worker is working");

        let command = self
            .shell
            .command(&request.verb)
            .or_else(|| self.shell.command(FALLBACK_VERB));

        match command {
            Some(command) => command
                .execute(&self.bot, &request.arguments)
                .map_err(|error| {
                    self.bot.say(format!(
                        "Sorry, I do not know how to handle '{}'",
                        request.verb
                    ));
                    error
                }),
            None => {
                self.bot.say(format!(
                    "Sorry, I do not know how to handle '{}'",
                    request.verb
                ));
                Ok(())
            }
        }
    }
}

//! Lifecycle orchestration: owns the state store, the channels, and
//! the three runtime loops.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use palaver_core::{
    Bot, Channel, CommandRequest, Dispatcher, EventContext, EventHandler, PalaverError, RawItem,
    Result, State, Update,
};
use palaver_shell::{Command, Shell};

use crate::listener::Listener;
use crate::space::Space;
use crate::speaker::Speaker;
use crate::worker::Worker;

/// How long `stop()` waits for each loop to observe the shutdown
/// signals before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(1);

/// Engine lifecycle phases. Strictly forward: an engine is never
/// restarted after `stop()` — build a fresh one instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configured,
    Started,
    Stopped,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Powers one bot instance.
///
/// Data flow: inbound chat item → ears → [`Listener`] → inbox →
/// [`Worker`] → mouth → [`Speaker`] → chat space. The state store and
/// the dispatcher are the shared rendezvous points across all loops.
pub struct Engine {
    state: State,
    space: Arc<dyn Space>,
    dispatcher: Arc<Dispatcher>,
    shell: Arc<Shell>,
    bot: Bot,
    ears: Arc<Channel<RawItem>>,
    inbox: Arc<Channel<CommandRequest>>,
    mouth: Arc<Channel<Update>>,
    tee: Mutex<Option<Arc<Channel<RawItem>>>>,
    fan: Mutex<Option<Arc<Channel<RawItem>>>>,
    cancel: CancellationToken,
    phase: Mutex<Phase>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    on_start: Mutex<Option<Hook>>,
    on_stop: Mutex<Option<Hook>>,
}

impl Engine {
    pub fn new(space: Arc<dyn Space>) -> Self {
        Self::with_state(State::new(), space)
    }

    pub fn with_state(state: State, space: Arc<dyn Space>) -> Self {
        let ears = Arc::new(Channel::new());
        let inbox = Arc::new(Channel::new());
        let mouth = Arc::new(Channel::new());
        let bot = Bot::new(state.clone(), mouth.clone());
        let shell = Arc::new(Shell::new(state.clone(), bot.clone(), inbox.clone()));
        Self {
            state,
            space,
            dispatcher: Arc::new(Dispatcher::new()),
            shell,
            bot,
            ears,
            inbox,
            mouth,
            tee: Mutex::new(None),
            fan: Mutex::new(None),
            cancel: CancellationToken::new(),
            phase: Mutex::new(Phase::Configured),
            tasks: Mutex::new(Vec::new()),
            on_start: Mutex::new(None),
            on_stop: Mutex::new(None),
        }
    }

    /// Applies settings and seeds the defaults the loops rely on:
    /// the on/off switch, a bot name, and a generated bot identity.
    pub fn configure(&self, settings: &Value) {
        self.state.apply(settings);
        self.state.ensure("general.switch", json!("on"));
        self.bot.ensure_identity();
    }

    // ── Shared state proxies ───────────────────────────────────

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.state.get(key, default)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.state.set(key, value)
    }

    pub fn increment(&self, key: &str, delta: i64) -> i64 {
        self.state.increment(key, delta)
    }

    pub fn decrement(&self, key: &str, delta: i64) -> i64 {
        self.state.decrement(key, delta)
    }

    /// The name people address this bot by.
    pub fn name(&self) -> String {
        self.bot.name()
    }

    // ── Events ─────────────────────────────────────────────────

    pub fn subscribe<H>(&self, event: &str, handler: &Arc<H>) -> Result<()>
    where
        H: EventHandler + 'static,
    {
        self.dispatcher.subscribe(event, handler)
    }

    pub fn dispatch(&self, event: &str, context: &EventContext) -> Result<()> {
        self.dispatcher.dispatch(event, context)
    }

    // ── Commands ───────────────────────────────────────────────

    pub fn load_command(&self, command: Arc<dyn Command>) -> Result<()> {
        self.shell.load_command(command)
    }

    pub fn load_commands(&self, batch: Vec<Arc<dyn Command>>) -> Result<()> {
        self.shell.load_commands(batch)
    }

    pub fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    // ── Channels ───────────────────────────────────────────────

    /// The inbound channel; the chat transport pushes raw items here.
    pub fn ears(&self) -> Arc<Channel<RawItem>> {
        self.ears.clone()
    }

    pub fn inbox(&self) -> Arc<Channel<CommandRequest>> {
        self.inbox.clone()
    }

    pub fn mouth(&self) -> Arc<Channel<Update>> {
        self.mouth.clone()
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Duplicates every raw inbound item to the returned channel,
    /// before interpretation. Call before `start()`.
    pub fn tee(&self) -> Arc<Channel<RawItem>> {
        self.tee
            .lock()
            .get_or_insert_with(|| Arc::new(Channel::new()))
            .clone()
    }

    /// Channel receiving input that was not addressed to the bot, for
    /// downstream observers. Forwarding only happens while `fan.stamp`
    /// is fresh. Call before `start()`.
    pub fn fan(&self) -> Arc<Channel<RawItem>> {
        self.fan
            .lock()
            .get_or_insert_with(|| Arc::new(Channel::new()))
            .clone()
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Hook run right after the loops are spawned.
    pub fn set_start_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_start.lock() = Some(Box::new(hook));
    }

    /// Hook run while stopping, before the switch flips off.
    pub fn set_stop_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_stop.lock() = Some(Box::new(hook));
    }

    /// Brings the whole pipeline up: flips the switch on, connects the
    /// space, spawns the three loops, then dispatches `start`.
    pub async fn start(&self) -> Result<()> {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Configured {
                return Err(PalaverError::NotStartable(format!("{:?}", *phase)));
            }
            *phase = Phase::Started;
        }

        info!("starting the bot");
        self.state.set("general.switch", json!("on"));
        self.bot.ensure_identity();
        self.space.connect().await?;

        let listener = Listener {
            state: self.state.clone(),
            ears: self.ears.clone(),
            shell: self.shell.clone(),
            dispatcher: self.dispatcher.clone(),
            tee: self.tee.lock().clone(),
            fan: self.fan.lock().clone(),
            cancel: self.cancel.clone(),
        };
        let worker = Worker {
            state: self.state.clone(),
            inbox: self.inbox.clone(),
            shell: self.shell.clone(),
            bot: self.bot.clone(),
            cancel: self.cancel.clone(),
        };
        let speaker = Speaker {
            state: self.state.clone(),
            mouth: self.mouth.clone(),
            space: self.space.clone(),
            cancel: self.cancel.clone(),
        };

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(listener.run()));
        tasks.push(tokio::spawn(async move {
            if let Err(fault) = worker.run().await {
                // soft failure already went to the user; surface the rest
                error!(%fault, "worker terminated on handler fault");
            }
        }));
        tasks.push(tokio::spawn(speaker.run()));
        drop(tasks);

        if let Some(hook) = &*self.on_start.lock() {
            hook();
        }
        self.dispatch("start", &EventContext::new())
    }

    /// Brings the pipeline down: dispatches `stop`, flips the switch
    /// off, signals every loop, and waits a short grace period for them
    /// to exit. Items still queued at this point may be lost — that is
    /// the documented shutdown semantics, not a bug.
    pub async fn stop(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Started {
                return;
            }
            *phase = Phase::Stopped;
        }

        info!("stopping the bot");
        if let Err(error) = self.dispatch("stop", &EventContext::new()) {
            warn!(%error, "a stop handler failed");
        }
        if let Some(hook) = &*self.on_stop.lock() {
            hook();
        }

        self.state.set("general.switch", json!("off"));
        self.ears.poison();
        self.inbox.poison();
        self.mouth.poison();
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for mut handle in handles {
            if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                warn!("a loop ignored the shutdown signal, aborting it");
                handle.abort();
            }
        }
    }
}

use thiserror::Error;

/// Unified error type for the entire Palaver runtime.
#[derive(Error, Debug)]
pub enum PalaverError {
    // ── Dispatch errors ────────────────────────────────────────
    #[error("unknown event: '{0}' was never registered")]
    UnknownEvent(String),

    #[error("handler does not support event '{0}'")]
    UnsupportedEvent(String),

    #[error("event handler failed on '{event}': {reason}")]
    Handler { event: String, reason: String },

    // ── Shell errors ───────────────────────────────────────────
    #[error("duplicate command keyword: '{0}'")]
    DuplicateCommand(String),

    #[error("command '{verb}' failed: {reason}")]
    Command { verb: String, reason: String },

    // ── State errors ───────────────────────────────────────────
    #[error("missing '{0}' in state")]
    MissingKey(String),

    #[error("invalid value for '{0}' in state")]
    InvalidValue(String),

    // ── Inbound event errors ───────────────────────────────────
    #[error("malformed inbound event: {0}")]
    MalformedEvent(String),

    // ── Bus errors ─────────────────────────────────────────────
    #[error("bus topic must not be empty")]
    EmptyTopic,

    #[error("bus topic '{0}' contains the frame delimiter")]
    InvalidTopic(String),

    #[error("bus message must not be empty")]
    EmptyMessage,

    #[error("bus error: {0}")]
    Bus(String),

    // ── Engine errors ──────────────────────────────────────────
    #[error("engine cannot start from the '{0}' phase")]
    NotStartable(String),

    #[error("space error: {0}")]
    Space(String),

    // ── Wrapped externals ──────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, PalaverError>;

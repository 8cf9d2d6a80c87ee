//! # palaver-shell
//!
//! The shell: a verb → command registry plus the line-dispatch logic
//! that turns one line of chat text into an immediate execution or a
//! queued work item.

pub mod command;
pub mod shell;

pub use command::Command;
pub use shell::{FALLBACK_VERB, Shell};

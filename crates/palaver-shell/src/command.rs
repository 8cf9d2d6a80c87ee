//! The contract every command handler implements.

use palaver_core::{Bot, Result};

/// One verb the shell can react to.
///
/// Interactive commands run synchronously in the listener's task and
/// should return quickly; everything else is queued to the worker.
pub trait Command: Send + Sync {
    /// The verb bound to this command. Keywords are unique per shell —
    /// loading a duplicate is a fatal configuration error.
    fn keyword(&self) -> &str;

    /// One-line description shown by help surfaces.
    fn information_message(&self) -> &str;

    /// Usage details, when the verb takes arguments.
    fn usage_message(&self) -> Option<&str> {
        None
    }

    /// Whether to execute in the listener's task (`true`) or queue to
    /// the worker (`false`).
    fn is_interactive(&self) -> bool {
        true
    }

    /// Hidden commands are excluded from help listings.
    fn is_hidden(&self) -> bool {
        false
    }

    /// Runs the command. `arguments` is everything after the verb.
    fn execute(&self, bot: &Bot, arguments: &str) -> Result<()>;
}

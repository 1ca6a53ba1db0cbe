//! User-facing failure notification

use std::io::Write;

use tracing::warn;

use crate::errors::ControlError;

/// Blocking notification shown on the failure path. Returning only after the
/// user has seen the message is part of the contract.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> Result<(), ControlError>;
}

/// Writes notifications to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) -> Result<(), ControlError> {
        warn!(%message, "Review failure notification");
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{message}").map_err(|err| ControlError::Notify(err.to_string()))
    }
}

use crate::domain::ports::Notifier;
use tracing::{error, info};

/// Sends user notifications to the log. Used by the CLI, which has no toast surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(notification = "success", "{message}");
    }

    fn error(&self, message: &str) {
        error!(notification = "error", "{message}");
    }
}

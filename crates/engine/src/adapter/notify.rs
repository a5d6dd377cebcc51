//! User-facing error notification.

use tracing::error;

/// Receives failure messages meant for the user; fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Reports notifications through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_error(&self, message: &str) {
        error!(%message, "table query failed");
    }
}

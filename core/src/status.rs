use tracing::error;
use tracing::info;
use tracing::warn;

/// Operator-visible notices. Backend and storage failures are converted to
/// messages through this seam instead of propagating past operation
/// boundaries; the host environment decides how to show them.
pub trait StatusSink: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: routes notices to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}

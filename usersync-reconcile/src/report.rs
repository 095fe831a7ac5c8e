//! Reporter backed by `tracing`.

use usersync_core::{Level, ReportEvent, Reporter};

/// Forwards run events to the installed `tracing` subscriber. The event's own
/// timestamp travels as the `timestamp` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, event: ReportEvent) {
        let timestamp = event.timestamp.to_rfc3339();
        match event.level {
            Level::Info => tracing::info!(timestamp = %timestamp, "{}", event.message),
            Level::Error => tracing::error!(timestamp = %timestamp, "{}", event.message),
        }
    }
}

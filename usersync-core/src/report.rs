//! The reporter seam: a write-only sink for what a run did.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// One entry of the run's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEvent {
    pub level: Level,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ReportEvent {
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives events at every state transition and mutation. Never read back.
pub trait Reporter {
    fn emit(&self, event: ReportEvent);

    fn info(&self, message: &str) {
        self.emit(ReportEvent::now(Level::Info, message));
    }

    fn error(&self, message: &str) {
        self.emit(ReportEvent::now(Level::Error, message));
    }
}

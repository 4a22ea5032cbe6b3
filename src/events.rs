use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A diagnostic message emitted while replacing or verifying.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
}

/// Receives the progress and diagnostic messages of the replacement pipeline.
pub trait EventSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => log::debug!("{}", message),
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
    }
}

/// Keeps every event in memory, in emission order. Events are forwarded to the `log` facade as well.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The messages of the given severity.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.severity == severity)
            .map(|event| event.message)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, severity: Severity, message: &str) {
        LogSink.emit(severity, message);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Event {
                severity,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_the_order() {
        let sink = RecordingSink::new();
        sink.info("Page 1: 2 replacements");
        sink.warn("Font CustomSans not found");
        sink.info("Total replacements: 2");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.messages(Severity::Info),
            ["Page 1: 2 replacements", "Total replacements: 2"]
        );
        assert_eq!(sink.messages(Severity::Warning), ["Font CustomSans not found"]);
        assert!(Severity::Error > Severity::Warning);
    }
}

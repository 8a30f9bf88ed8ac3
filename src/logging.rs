//! Log collaborator interface.
//!
//! Providers do not write failure logs themselves; callers that want a provider's
//! diagnostics routed somewhere hand them to a [`LogSink`].

use serde::{Deserialize, Serialize};

/// Severity of a log message, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogPriority {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

pub trait LogSink: Send + Sync {
    fn write(&self, message: &str, priority: LogPriority);
}

/// Forwards messages to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, message: &str, priority: LogPriority) {
        match priority {
            LogPriority::Trace => tracing::trace!(target: "sql_provider", "{message}"),
            LogPriority::Debug => tracing::debug!(target: "sql_provider", "{message}"),
            LogPriority::Info => tracing::info!(target: "sql_provider", "{message}"),
            LogPriority::Warning => tracing::warn!(target: "sql_provider", "{message}"),
            LogPriority::Error => tracing::error!(target: "sql_provider", "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, LogPriority)>>);

    impl LogSink for Recorder {
        fn write(&self, message: &str, priority: LogPriority) {
            if let Ok(mut entries) = self.0.lock() {
                entries.push((message.to_string(), priority));
            }
        }
    }

    #[test]
    fn sinks_are_object_safe() {
        let recorder = Recorder::default();
        {
            let sink: &dyn LogSink = &recorder;
            sink.write("opened", LogPriority::Debug);
            sink.write("failed", LogPriority::Error);
        }
        let entries = recorder.0.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].1 > entries[0].1);
        TracingLogSink.write("no subscriber installed", LogPriority::Info);
    }
}

//! Injectable logger for the health responder.

/// Sink for human-readable log messages. Must tolerate concurrent calls.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Drops every message. Used when no logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardLogger;

impl Logger for DiscardLogger {
    fn log(&self, _message: &str) {}
}

/// Forwards messages to `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

use crate::library::logger::interface::{join_namespace, LogLevel, Logger};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub namespace: Option<String>,
    pub message: String,
}

/// Keeps every line in memory. Children created with `with_namespace`
/// write into the same buffer.
#[derive(Debug, Clone, Default)]
pub struct LoggerFake {
    namespace: Option<String>,
    entries: Arc<Mutex<Vec<LogEntry>>>,
    failing: bool,
}

impl LoggerFake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every line, then reports the write as failed.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.level == level && entry.message.contains(needle))
    }
}

impl Logger for LoggerFake {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                level,
                namespace: self.namespace.clone(),
                message: message.to_string(),
            });
        if self.failing {
            return Err("log sink closed".into());
        }
        Ok(())
    }

    fn with_namespace(&self, namespace: &str) -> Arc<dyn Logger + Send + Sync> {
        Arc::new(LoggerFake {
            namespace: Some(join_namespace(self.namespace.as_deref(), namespace)),
            entries: self.entries.clone(),
            failing: self.failing,
        })
    }
}

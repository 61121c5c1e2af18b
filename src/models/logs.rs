use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub logger_name: String,
    pub message: String,
    pub log_file: String,
    pub raw_line: String,
    pub parsed: bool,
}

/// Fixed-capacity, newest-first buffer of server log lines.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    cap: usize,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
        }
    }

    /// Wholesale replacement (`log_data`).
    pub fn replace(&mut self, entries: Vec<LogEntry>) {
        self.entries = entries.into_iter().take(self.cap).collect();
    }

    /// Put fresh lines in front (`log_update`); the oldest fall off the end.
    pub fn prepend(&mut self, fresh: Vec<LogEntry>) {
        for entry in fresh.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.entries.truncate(self.cap);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

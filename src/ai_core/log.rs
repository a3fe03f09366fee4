//! Rolling core log

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the core's lifetime log, starting at 0
    pub seq: u64,
    pub line: String,
}

/// Bounded log; the oldest entries go first once full
#[derive(Debug, Clone)]
pub struct RollingLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    total: u64,
}

impl RollingLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            seq: self.total,
            line: line.into(),
        });
        self.total += 1;
    }

    /// Last `n` entries, oldest first
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ever written, including dropped ones
    pub fn total_written(&self) -> u64 {
        self.total
    }
}

// Send History
// Bounded record of the most recent sentences handed to the transport

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Where a sent line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSource {
    Wind,
    Gps,
    Relay,
}

/// One sent line and how the send went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentLine {
    /// Sentence without the trailing CR/LF
    pub line: String,
    pub source: LineSource,
    /// At least one destination accepted it
    pub ok: bool,
    /// Status text for this send
    pub detail: String,
    pub sent_at: DateTime<Utc>,
}

/// Oldest first, newest last; the oldest entry drops out when full
#[derive(Debug, Clone)]
pub struct SendHistory {
    capacity: usize,
    entries: VecDeque<SentLine>,
}

impl SendHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: SentLine) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Sentence text, most recent last
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.line.clone()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SentLine> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&SentLine> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

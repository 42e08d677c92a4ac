use std::collections::VecDeque;

pub const TRACE_CAPACITY: usize = 100;

/// The most recently executed instructions, newest first.
#[derive(Debug, Default)]
pub struct TraceLog {
    entries: VecDeque<String>,
}

impl TraceLog {
    pub fn record(&mut self, entry: String) {
        self.entries.push_front(entry);
        self.entries.truncate(TRACE_CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

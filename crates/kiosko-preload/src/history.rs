//! Recently activated modules, used as input for prediction.

use std::collections::VecDeque;

/// Bounded list of the most recent distinct module names in visitation order.
#[derive(Debug, Clone)]
pub struct AccessHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl AccessHistory {
    /// Creates an empty history holding at most `limit` names.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::with_capacity(limit), limit }
    }

    /// Records a visit. A name already present moves to the most recent position.
    pub fn record(&mut self, module: &str) {
        self.entries.retain(|entry| entry != module);
        self.entries.push_back(module.to_string());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// The most recently visited module.
    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Names from oldest to most recent.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Number of recorded names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

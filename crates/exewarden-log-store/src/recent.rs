//! Bounded ring of the most recent output lines.

use std::collections::VecDeque;

/// Keeps the last `capacity` lines, dropping the oldest on overflow.
#[derive(Debug, Clone)]
pub struct RecentLines {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RecentLines {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// The last `n` lines (fewer if fewer were kept), oldest first.
    pub fn last(&self, n: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(n);
        self.lines.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_capacity_lines() {
        let mut ring = RecentLines::new(3);
        for i in 1..=5 {
            ring.push(format!("line {}", i));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.last(10), vec!["line 3", "line 4", "line 5"]);
    }

    #[test]
    fn test_last_returns_suffix_in_order() {
        let mut ring = RecentLines::new(50);
        for i in 1..=20 {
            ring.push(i.to_string());
        }
        let tail = ring.last(15);
        assert_eq!(tail.len(), 15);
        assert_eq!(tail.first().map(String::as_str), Some("6"));
        assert_eq!(tail.last().map(String::as_str), Some("20"));
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut ring = RecentLines::new(0);
        ring.push("ignored");
        assert!(ring.is_empty());
    }
}

use serde::{Deserialize, Serialize};

/// Half-open entry window `[start_time, start_time + duration)` in unix
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryWindow {
    pub start_time: i64,
    pub duration: i64,
}

impl EntryWindow {
    pub fn new(start_time: i64, duration: i64) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    pub fn ends_at(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Entries are accepted strictly before `ends_at`.
    pub fn accepts_entries(&self, now: i64) -> bool {
        now < self.ends_at()
    }

    pub fn has_ended(&self, now: i64) -> bool {
        now >= self.ends_at()
    }

    pub fn remaining(&self, now: i64) -> i64 {
        (self.ends_at() - now).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_boundaries() {
        let window = EntryWindow::new(1_000, 60);
        assert_eq!(window.ends_at(), 1_060);
        assert!(window.accepts_entries(1_059));
        assert!(!window.accepts_entries(1_060));
        assert!(window.has_ended(1_060));
        assert_eq!(window.remaining(1_030), 30);
        assert_eq!(window.remaining(2_000), 0);
    }

    #[test]
    fn test_entries_before_start_are_accepted() {
        // Pools may be created ahead of their start; only the end is enforced
        let window = EntryWindow::new(5_000, 10);
        assert!(window.accepts_entries(100));
    }
}

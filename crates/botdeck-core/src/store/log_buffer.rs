// ── Bounded log buffer ──
//
// Two independent FIFO windows over the same incoming lines: a long one
// for the log view and a short one for the overview panel. Each evicts
// its own oldest entry once over capacity, so callers must not assume
// `recent` is a suffix of `all`.

use std::collections::VecDeque;
use std::sync::Arc;

use botdeck_api::LogEntry;

pub const DEFAULT_FULL_CAPACITY: usize = 1000;
pub const DEFAULT_RECENT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct BoundedLogBuffer {
    all: VecDeque<Arc<LogEntry>>,
    recent: VecDeque<Arc<LogEntry>>,
    full_capacity: usize,
    recent_capacity: usize,
}

impl Default for BoundedLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FULL_CAPACITY, DEFAULT_RECENT_CAPACITY)
    }
}

impl BoundedLogBuffer {
    pub fn new(full_capacity: usize, recent_capacity: usize) -> Self {
        Self {
            all: VecDeque::with_capacity(full_capacity.min(DEFAULT_FULL_CAPACITY)),
            recent: VecDeque::with_capacity(recent_capacity.min(DEFAULT_RECENT_CAPACITY)),
            full_capacity,
            recent_capacity,
        }
    }

    /// Append one line to both windows.
    pub fn append(&mut self, entry: LogEntry) {
        let entry = Arc::new(entry);
        push_bounded(&mut self.all, Arc::clone(&entry), self.full_capacity);
        push_bounded(&mut self.recent, entry, self.recent_capacity);
    }

    /// Replace both windows with a historical batch (oldest first). Only
    /// the newest entries that fit each window are kept.
    pub fn seed(&mut self, batch: impl IntoIterator<Item = LogEntry>) {
        self.clear();
        for entry in batch {
            self.append(entry);
        }
    }

    /// Empty both windows. Later appends are unaffected.
    pub fn clear(&mut self) {
        self.all.clear();
        self.recent.clear();
    }

    /// The long window, oldest first.
    pub fn all(&self) -> Vec<Arc<LogEntry>> {
        self.all.iter().cloned().collect()
    }

    /// The short window, oldest first.
    pub fn recent(&self) -> Vec<Arc<LogEntry>> {
        self.recent.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn capacities(&self) -> (usize, usize) {
        (self.full_capacity, self.recent_capacity)
    }
}

fn push_bounded(window: &mut VecDeque<Arc<LogEntry>>, entry: Arc<LogEntry>, cap: usize) {
    if cap == 0 {
        return;
    }
    while window.len() >= cap {
        window.pop_front();
    }
    window.push_back(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> LogEntry {
        LogEntry::new(format!("00:00:{n:02}"), format!("e{n}"))
    }

    fn messages(entries: &[Arc<LogEntry>]) -> Vec<String> {
        entries.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn windows_stay_bounded() {
        let mut buf = BoundedLogBuffer::default();
        for n in 1..=1500 {
            buf.append(entry(n));
        }
        let all = buf.all();
        let recent = buf.recent();
        assert_eq!(all.len(), 1000);
        assert_eq!(recent.len(), 100);
        assert_eq!(all.last().map(|e| e.message.as_str()), Some("e1500"));
        assert_eq!(recent.last().map(|e| e.message.as_str()), Some("e1500"));
    }

    #[test]
    fn oldest_entry_is_evicted_first() {
        let mut buf = BoundedLogBuffer::default();
        for n in 1..=1001 {
            buf.append(entry(n));
        }
        let all = buf.all();
        assert!(all.iter().all(|e| e.message != "e1"));
        assert_eq!(all[0].message, "e2");
        assert_eq!(buf.recent()[0].message, "e902");
    }

    #[test]
    fn seed_replaces_both_windows() {
        let mut buf = BoundedLogBuffer::new(4, 2);
        buf.append(entry(99));
        buf.seed((1..=5).map(entry));
        assert_eq!(messages(&buf.all()), ["e2", "e3", "e4", "e5"]);
        assert_eq!(messages(&buf.recent()), ["e4", "e5"]);
    }

    #[test]
    fn clear_then_append() {
        let mut buf = BoundedLogBuffer::new(4, 2);
        buf.seed((1..=3).map(entry));
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.recent().is_empty());
        buf.append(entry(7));
        assert_eq!(messages(&buf.all()), ["e7"]);
        assert_eq!(messages(&buf.recent()), ["e7"]);
    }

    #[test]
    fn zero_capacity_window_stays_empty() {
        let mut buf = BoundedLogBuffer::new(3, 0);
        buf.append(entry(1));
        assert_eq!(buf.len(), 1);
        assert!(buf.recent().is_empty());
    }
}

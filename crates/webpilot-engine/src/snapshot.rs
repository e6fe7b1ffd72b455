//! DOM snapshots captured per execution.

use std::collections::VecDeque;

use parking_lot::Mutex;
use webpilot_protocols::PageDebugInfo;

/// Keeps the snapshots of the most recent executions.
///
/// Oldest executions are evicted once `retention` is exceeded.
pub struct SnapshotStore {
    entries: Mutex<VecDeque<(String, Vec<PageDebugInfo>)>>,
    retention: usize,
}

impl SnapshotStore {
    pub fn new(retention: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    /// File a snapshot under an execution.
    pub fn record(&self, execution_id: &str, snapshot: PageDebugInfo) {
        let mut entries = self.entries.lock();
        if let Some((_, snapshots)) = entries.iter_mut().find(|(id, _)| id == execution_id) {
            snapshots.push(snapshot);
            return;
        }
        while entries.len() >= self.retention {
            entries.pop_front();
        }
        entries.push_back((execution_id.to_string(), vec![snapshot]));
    }

    /// All snapshots of an execution, in capture order.
    pub fn get(&self, execution_id: &str) -> Vec<PageDebugInfo> {
        self.entries
            .lock()
            .iter()
            .find(|(id, _)| id == execution_id)
            .map(|(_, snapshots)| snapshots.clone())
            .unwrap_or_default()
    }

    /// Most recent snapshot of an execution.
    pub fn latest(&self, execution_id: &str) -> Option<PageDebugInfo> {
        self.entries
            .lock()
            .iter()
            .find(|(id, _)| id == execution_id)
            .and_then(|(_, snapshots)| snapshots.last().cloned())
    }

    pub fn execution_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let store = SnapshotStore::new(4);
        store.record("e1", PageDebugInfo::new("https://a", "<p>1</p>"));
        store.record("e1", PageDebugInfo::new("https://b", "<p>2</p>"));
        assert_eq!(store.get("e1").len(), 2);
        assert_eq!(store.latest("e1").unwrap().url, "https://b");
        assert!(store.get("e2").is_empty());
        assert!(store.latest("e2").is_none());
    }

    #[test]
    fn test_retention_evicts_oldest_execution() {
        let store = SnapshotStore::new(2);
        for id in ["e1", "e2", "e3"] {
            store.record(id, PageDebugInfo::new("https://a", ""));
        }
        assert_eq!(store.execution_count(), 2);
        assert!(store.get("e1").is_empty());
        assert_eq!(store.get("e3").len(), 1);
    }
}

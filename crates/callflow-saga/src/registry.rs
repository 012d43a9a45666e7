use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::audit::SagaAuditLog;
use crate::context::SagaContext;
use crate::record::{SagaRecord, SagaSnapshot};

/// In-memory store of every saga record, keyed by saga id.
///
/// Cloning yields another handle to the same store. The lock is only held
/// for the duration of a single insert, update, read or sweep and never
/// across an await point, so queries never wait on a running step.
#[derive(Debug, Clone, Default)]
pub struct SagaRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: RwLock<HashMap<String, SagaRecord>>,
    next_execution: AtomicU64,
}

impl SagaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh pending record and return its execution token along
    /// with whether a record with the same id was replaced.
    pub(crate) fn create(
        &self,
        id: &str,
        step_names: Vec<String>,
        context: SagaContext,
    ) -> (u64, bool) {
        let execution = self.inner.next_execution.fetch_add(1, Ordering::Relaxed);
        let record = SagaRecord::new(id.to_string(), execution, step_names, context);
        let replaced = self
            .inner
            .records
            .write()
            .insert(id.to_string(), record)
            .is_some();
        (execution, replaced)
    }

    /// Apply `f` to the record for `id` if it still belongs to `execution`.
    ///
    /// Returns `false` when the record was evicted or replaced by a newer
    /// execution under the same id.
    pub(crate) fn update<F>(&self, id: &str, execution: u64, f: F) -> bool
    where
        F: FnOnce(&mut SagaRecord),
    {
        let mut records = self.inner.records.write();
        match records.get_mut(id) {
            Some(record) if record.execution == execution => {
                f(record);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<SagaSnapshot> {
        self.inner.records.read().get(id).map(SagaRecord::snapshot)
    }

    /// Snapshot every record, in unspecified order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SagaSnapshot> {
        self.inner
            .records
            .read()
            .values()
            .map(SagaRecord::snapshot)
            .collect()
    }

    #[must_use]
    pub fn audit(&self, id: &str) -> Option<SagaAuditLog> {
        self.inner
            .records
            .read()
            .get(id)
            .map(|record| record.audit.clone())
    }

    /// Context as of the last completed forward action.
    #[must_use]
    pub fn context(&self, id: &str) -> Option<SagaContext> {
        self.inner
            .records
            .read()
            .get(id)
            .map(|record| record.context.clone())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.records.read().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.records.read().is_empty()
    }

    /// Remove terminal records that started more than `max_age` ago and
    /// return their ids. Non-terminal records are kept regardless of age.
    pub fn evict_terminal_older_than(&self, max_age: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.inner.records.write().retain(|id, record| {
            if record.is_evictable(max_age) {
                evicted.push(id.clone());
                false
            } else {
                true
            }
        });
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SagaStatus;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn create_inserts_pending_record() {
        let registry = SagaRegistry::new();

        let (_, replaced) = registry.create("call-1", names(&["a"]), SagaContext::new());

        assert!(!replaced);
        let snapshot = registry.snapshot("call-1").expect("record should exist");
        assert_eq!(snapshot.status, SagaStatus::Pending);
        assert_eq!(snapshot.total_steps, 1);
    }

    #[test]
    fn unknown_id_has_no_snapshot() {
        let registry = SagaRegistry::new();

        assert!(registry.snapshot("missing").is_none());
        assert!(registry.audit("missing").is_none());
        assert!(registry.context("missing").is_none());
    }

    #[test]
    fn stale_execution_cannot_update_replaced_record() {
        let registry = SagaRegistry::new();
        let (first, _) = registry.create("call-1", names(&["a"]), SagaContext::new());
        let (second, replaced) = registry.create("call-1", names(&["a", "b"]), SagaContext::new());

        assert!(replaced);
        assert!(!registry.update("call-1", first, |record| record.start_step(0)));
        assert!(registry.update("call-1", second, |record| record.start_step(0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_share_records() {
        let registry = SagaRegistry::new();
        let handle = registry.clone();

        registry.create("call-1", Vec::new(), SagaContext::new());

        assert!(handle.contains("call-1"));
    }

    #[test]
    fn eviction_skips_non_terminal_records() {
        let registry = SagaRegistry::new();
        let (running, _) = registry.create("running", names(&["a"]), SagaContext::new());
        registry.update("running", running, |record| record.start_step(0));
        let (done, _) = registry.create("done", Vec::new(), SagaContext::new());
        registry.update("done", done, SagaRecord::finish_completed);

        std::thread::sleep(Duration::from_millis(2));
        let evicted = registry.evict_terminal_older_than(Duration::ZERO);

        assert_eq!(evicted, vec!["done".to_string()]);
        assert!(registry.contains("running"));
    }
}

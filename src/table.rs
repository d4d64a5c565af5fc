use std::collections::HashMap;
use std::sync::Mutex;

use crate::record::ServiceRecord;

/// Shared table of service records, keyed by instance label.
///
/// The engine mutates it while processing packets; callers read snapshots
/// from any thread. Lock poisoning is recovered from, a panicked writer
/// leaves at worst a partially updated record.
#[derive(Default, Debug)]
pub(crate) struct ServiceTable {
    records: Mutex<HashMap<String, ServiceRecord>>,
}

impl ServiceTable {
    pub(crate) fn new() -> Self {
        ServiceTable::default()
    }

    pub(crate) fn upsert(&self, record: ServiceRecord) {
        let mut records = self.lock();
        records.insert(record.name.clone(), record);
    }

    pub(crate) fn remove(&self, name: &str) -> Option<ServiceRecord> {
        self.lock().remove(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<ServiceRecord> {
        self.lock().get(name).cloned()
    }

    pub(crate) fn snapshot(&self) -> Vec<ServiceRecord> {
        let records = self.lock();
        let mut snapshot: Vec<ServiceRecord> = records.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ServiceRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

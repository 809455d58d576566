//! In-process record store.
//!
//! `MemoryZoneStore` behaves like the managed store closely enough to drive
//! the sync adapter in tests and dry runs: missing zones report
//! [`ZoneError::ZoneDeleted`], `DeleteSelf` references cascade, and every
//! mutation is appended to a per-zone change log that `fetch_changes` replays
//! to the registered delegate. Each call is journaled as a [`StoreCall`].

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::record::{Record, RecordId, RecordQuery, ReferenceAction, ZoneId};
use super::zone::{ZoneDelegate, ZoneError, ZoneStore};

/// One call received by the store, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FetchChanges(ZoneId),
    CreateZone(ZoneId),
    SaveIfNew(Vec<Record>),
    Modify {
        save: Vec<Record>,
        delete: Vec<RecordId>,
    },
    DeleteMatching(ZoneId, RecordQuery),
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::FetchChanges(_) => StoreOp::FetchChanges,
            StoreCall::CreateZone(_) => StoreOp::CreateZone,
            StoreCall::SaveIfNew(_) => StoreOp::SaveIfNew,
            StoreCall::Modify { .. } => StoreOp::Modify,
            StoreCall::DeleteMatching(..) => StoreOp::DeleteMatching,
        }
    }
}

/// Operation kinds, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchChanges,
    CreateZone,
    SaveIfNew,
    Modify,
    DeleteMatching,
}

#[derive(Debug, Clone)]
enum Change {
    Saved(String),
    Deleted(String),
}

#[derive(Debug, Default)]
struct ZoneState {
    records: BTreeMap<String, Record>,
    changes: Vec<Change>,
    delivered: usize,
}

#[derive(Default)]
struct State {
    zones: HashMap<ZoneId, ZoneState>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, VecDeque<ZoneError>>,
}

impl State {
    fn record_call(&mut self, call: StoreCall) -> Result<(), ZoneError> {
        let op = call.op();
        self.calls.push(call);
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn zone_mut(&mut self, zone: &ZoneId) -> Result<&mut ZoneState, ZoneError> {
        self.zones.get_mut(zone).ok_or(ZoneError::ZoneDeleted)
    }

    fn ensure_zones<'a>(&self, ids: impl IntoIterator<Item = &'a RecordId>) -> Result<(), ZoneError> {
        for id in ids {
            if !self.zones.contains_key(&id.zone) {
                return Err(ZoneError::ZoneDeleted);
            }
        }
        Ok(())
    }

    /// Delete `name` and every record that cascades from it.
    fn delete_cascading(&mut self, zone: &ZoneId, name: &str) {
        let Some(state) = self.zones.get_mut(zone) else {
            return;
        };
        let mut pending = vec![name.to_string()];
        while let Some(name) = pending.pop() {
            if state.records.remove(&name).is_none() {
                continue;
            }
            state.changes.push(Change::Deleted(name.clone()));
            let dependents: Vec<String> = state
                .records
                .values()
                .filter(|r| {
                    r.references().any(|reference| {
                        reference.action == ReferenceAction::DeleteSelf
                            && reference.target.zone == *zone
                            && reference.target.name == name
                    })
                })
                .map(|r| r.id.name.clone())
                .collect();
            pending.extend(dependents);
        }
    }
}

/// Record store kept entirely in memory.
#[derive(Default)]
pub struct MemoryZoneStore {
    state: Mutex<State>,
    delegate: Mutex<Option<Arc<dyn ZoneDelegate>>>,
}

impl MemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already contains `zone`.
    pub fn with_zone(zone: &ZoneId) -> Self {
        let mut state = State::default();
        state.zones.insert(zone.clone(), ZoneState::default());
        Self {
            state: Mutex::new(state),
            delegate: Mutex::new(None),
        }
    }

    pub async fn set_delegate(&self, delegate: Arc<dyn ZoneDelegate>) {
        *self.delegate.lock().await = Some(delegate);
    }

    /// Remove a zone and all its records, as if the user deleted it elsewhere.
    pub async fn delete_zone(&self, zone: &ZoneId) {
        self.state.lock().await.zones.remove(zone);
    }

    pub async fn has_zone(&self, zone: &ZoneId) -> bool {
        self.state.lock().await.zones.contains_key(zone)
    }

    /// Make the next call of kind `op` fail with `error`. Failures queue up.
    pub async fn fail_next(&self, op: StoreOp, error: ZoneError) {
        self.state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn record(&self, id: &RecordId) -> Option<Record> {
        let state = self.state.lock().await;
        state.zones.get(&id.zone)?.records.get(&id.name).cloned()
    }

    pub async fn records(&self, zone: &ZoneId) -> Vec<Record> {
        let state = self.state.lock().await;
        state
            .zones
            .get(zone)
            .map(|z| z.records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Write records directly, bypassing the journal. Used to simulate
    /// changes made by another device.
    pub async fn seed(&self, records: Vec<Record>) {
        let mut state = self.state.lock().await;
        for record in records {
            let zone = state.zones.entry(record.id.zone.clone()).or_default();
            zone.changes.push(Change::Saved(record.id.name.clone()));
            zone.records.insert(record.id.name.clone(), record);
        }
    }

    /// Remove a record directly (with cascade), bypassing the journal.
    pub async fn remove(&self, id: &RecordId) {
        self.state.lock().await.delete_cascading(&id.zone, &id.name);
    }
}

#[async_trait]
impl ZoneStore for MemoryZoneStore {
    async fn fetch_changes(&self, zone: &ZoneId) -> Result<(), ZoneError> {
        let (changed, deleted, end) = {
            let mut state = self.state.lock().await;
            state.record_call(StoreCall::FetchChanges(zone.clone()))?;
            let zone_state = state.zone_mut(zone)?;

            // Collapse the pending log so each record appears once, last change wins
            let mut latest: BTreeMap<&str, bool> = BTreeMap::new();
            for change in &zone_state.changes[zone_state.delivered..] {
                match change {
                    Change::Saved(name) => latest.insert(name.as_str(), true),
                    Change::Deleted(name) => latest.insert(name.as_str(), false),
                };
            }

            let mut changed = Vec::new();
            let mut deleted = Vec::new();
            for (name, saved) in latest {
                match zone_state.records.get(name) {
                    Some(record) if saved => changed.push(record.clone()),
                    _ => deleted.push(RecordId::new(name, zone)),
                }
            }
            (changed, deleted, zone_state.changes.len())
        };

        if changed.is_empty() && deleted.is_empty() {
            return Ok(());
        }

        let delegate = self.delegate.lock().await.clone();
        if let Some(delegate) = delegate {
            delegate.apply_changes(zone, changed, deleted).await?;
        }

        if let Some(zone_state) = self.state.lock().await.zones.get_mut(zone) {
            zone_state.delivered = end.min(zone_state.changes.len());
        }
        Ok(())
    }

    async fn create_zone(&self, zone: &ZoneId) -> Result<(), ZoneError> {
        let mut state = self.state.lock().await;
        state.record_call(StoreCall::CreateZone(zone.clone()))?;
        state.zones.entry(zone.clone()).or_default();
        Ok(())
    }

    async fn save_if_new(&self, records: Vec<Record>) -> Result<(), ZoneError> {
        let mut state = self.state.lock().await;
        state.record_call(StoreCall::SaveIfNew(records.clone()))?;
        state.ensure_zones(records.iter().map(|r| &r.id))?;

        for record in records {
            let zone = state.zone_mut(&record.id.zone)?;
            if zone.records.contains_key(&record.id.name) {
                continue;
            }
            zone.changes.push(Change::Saved(record.id.name.clone()));
            zone.records.insert(record.id.name.clone(), record);
        }
        Ok(())
    }

    async fn modify(
        &self,
        records: Vec<Record>,
        delete_ids: Vec<RecordId>,
    ) -> Result<(), ZoneError> {
        let mut state = self.state.lock().await;
        state.record_call(StoreCall::Modify {
            save: records.clone(),
            delete: delete_ids.clone(),
        })?;
        state.ensure_zones(records.iter().map(|r| &r.id).chain(delete_ids.iter()))?;

        for record in records {
            let zone = state.zone_mut(&record.id.zone)?;
            zone.changes.push(Change::Saved(record.id.name.clone()));
            zone.records.insert(record.id.name.clone(), record);
        }
        for id in delete_ids {
            state.delete_cascading(&id.zone, &id.name);
        }
        Ok(())
    }

    async fn delete_matching(&self, zone: &ZoneId, query: RecordQuery) -> Result<(), ZoneError> {
        let mut state = self.state.lock().await;
        state.record_call(StoreCall::DeleteMatching(zone.clone(), query.clone()))?;
        let matching: Vec<String> = state
            .zone_mut(zone)?
            .records
            .values()
            .filter(|r| query.matches(r))
            .map(|r| r.id.name.clone())
            .collect();
        for name in matching {
            state.delete_cascading(zone, &name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::record::{FieldValue, RecordReference};

    fn zone() -> ZoneId {
        ZoneId::current_user("Articles")
    }

    fn status(name: &str) -> Record {
        Record::new("ArticleStatus", RecordId::new(name, &zone()))
    }

    fn article_pointing_at(name: &str, target: &str) -> Record {
        let mut record = Record::new("Article", RecordId::new(name, &zone()));
        record.set(
            "articleStatus",
            FieldValue::Reference(RecordReference {
                target: RecordId::new(target, &zone()),
                action: ReferenceAction::DeleteSelf,
            }),
        );
        record
    }

    #[tokio::test]
    async fn test_missing_zone_reports_zone_deleted() {
        let store = MemoryZoneStore::new();
        let result = store.save_if_new(vec![status("s|1")]).await;
        assert_eq!(result, Err(ZoneError::ZoneDeleted));
        assert_eq!(store.fetch_changes(&zone()).await, Err(ZoneError::ZoneDeleted));
    }

    #[tokio::test]
    async fn test_save_if_new_keeps_existing_record() {
        let store = MemoryZoneStore::with_zone(&zone());
        let mut first = status("s|1");
        first.set_string("read", Some("0"));
        store.save_if_new(vec![first]).await.unwrap();

        let mut second = status("s|1");
        second.set_string("read", Some("1"));
        store.save_if_new(vec![second]).await.unwrap();

        let stored = store.record(&RecordId::new("s|1", &zone())).await.unwrap();
        assert_eq!(stored.string("read"), Some("0"));
    }

    #[tokio::test]
    async fn test_delete_cascades_through_references() {
        let store = MemoryZoneStore::with_zone(&zone());
        store
            .save_if_new(vec![status("s|1"), article_pointing_at("a|1", "s|1")])
            .await
            .unwrap();

        store
            .modify(vec![], vec![RecordId::new("s|1", &zone())])
            .await
            .unwrap();

        assert!(store.records(&zone()).await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = MemoryZoneStore::with_zone(&zone());
        store
            .fail_next(StoreOp::Modify, ZoneError::Network("offline".into()))
            .await;

        assert!(store.modify(vec![status("s|1")], vec![]).await.is_err());
        assert!(store.modify(vec![status("s|1")], vec![]).await.is_ok());
        assert_eq!(store.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_create_zone_is_idempotent() {
        let store = MemoryZoneStore::with_zone(&zone());
        store.save_if_new(vec![status("s|1")]).await.unwrap();
        store.create_zone(&zone()).await.unwrap();
        assert_eq!(store.records(&zone()).await.len(), 1);
    }
}

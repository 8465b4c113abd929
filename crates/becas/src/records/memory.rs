use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};

use super::{
    text_of, Collection, ListQuery, Precondition, RecordStore, StoreError, StoreErrorKind,
    StoreOperation,
};

/// In-process record store with json-server semantics.
///
/// Records keep insertion order per collection. Missing ids are issued from a monotonic
/// sequence shared by all collections, skipping ids already taken by seeded records. [`RecordStore::patch_if`] checks and writes under one
/// lock, so conditional updates are atomic here.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
    sequence: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .map(|guard| guard.get(&collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn lock(
        &self,
        operation: StoreOperation,
        collection: Collection,
    ) -> Result<MutexGuard<'_, HashMap<Collection, Vec<Value>>>, StoreError> {
        self.collections.lock().map_err(|_| {
            StoreError::new(
                operation,
                collection,
                StoreErrorKind::Unavailable("memory store lock poisoned".to_string()),
            )
        })
    }

    fn next_id(&self) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        id.to_string()
    }
}

fn record_id(record: &Value) -> Option<String> {
    record.get("id").filter(|id| !id.is_null()).map(text_of)
}

fn position(records: &[Value], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|record| record_id(record).as_deref() == Some(id))
}

fn as_object(
    operation: StoreOperation,
    collection: Collection,
    value: Value,
) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::new(
            operation,
            collection,
            StoreErrorKind::Decode(format!("expected a JSON object, found {other}")),
        )),
    }
}

fn merge(target: &mut Value, changes: Map<String, Value>) {
    if let Value::Object(existing) = target {
        for (key, value) in changes {
            if key != "id" {
                existing.insert(key, value);
            }
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let guard = self.lock(StoreOperation::List, collection)?;
        let records = guard.get(&collection).cloned().unwrap_or_default();
        Ok(query.apply(records))
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.lock(StoreOperation::Get, collection)?;
        Ok(guard
            .get(&collection)
            .and_then(|records| position(records, id).map(|index| records[index].clone())))
    }

    fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let mut object = as_object(StoreOperation::Create, collection, record)?;
        let mut guard = self.lock(StoreOperation::Create, collection)?;
        let records = guard.entry(collection).or_default();

        let id = match object.get("id").filter(|id| !id.is_null()).map(text_of) {
            Some(id) if !id.is_empty() => {
                if position(records, &id).is_some() {
                    return Err(StoreError::new(
                        StoreOperation::Create,
                        collection,
                        StoreErrorKind::Conflict(id),
                    ));
                }
                id
            }
            _ => loop {
                let issued = self.next_id();
                if position(records, &issued).is_none() {
                    break issued;
                }
            },
        };

        object.insert("id".to_string(), Value::String(id));
        let stored = Value::Object(object);
        records.push(stored.clone());
        Ok(stored)
    }

    fn patch(&self, collection: Collection, id: &str, changes: Value) -> Result<Value, StoreError> {
        let changes = as_object(StoreOperation::Update, collection, changes)?;
        let mut guard = self.lock(StoreOperation::Update, collection)?;
        let records = guard.entry(collection).or_default();
        let index = position(records, id).ok_or_else(|| {
            StoreError::new(
                StoreOperation::Update,
                collection,
                StoreErrorKind::NotFound(id.to_string()),
            )
        })?;

        merge(&mut records[index], changes);
        Ok(records[index].clone())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut guard = self.lock(StoreOperation::Delete, collection)?;
        let records = guard.entry(collection).or_default();
        let index = position(records, id).ok_or_else(|| {
            StoreError::new(
                StoreOperation::Delete,
                collection,
                StoreErrorKind::NotFound(id.to_string()),
            )
        })?;
        records.remove(index);
        Ok(())
    }

    fn patch_if(
        &self,
        collection: Collection,
        id: &str,
        precondition: &Precondition,
        changes: Value,
    ) -> Result<Value, StoreError> {
        let changes = as_object(StoreOperation::Update, collection, changes)?;
        let mut guard = self.lock(StoreOperation::Update, collection)?;
        let records = guard.entry(collection).or_default();
        let index = position(records, id).ok_or_else(|| {
            StoreError::new(
                StoreOperation::Update,
                collection,
                StoreErrorKind::NotFound(id.to_string()),
            )
        })?;

        if !precondition.holds(&records[index]) {
            return Err(StoreError::new(
                StoreOperation::Update,
                collection,
                StoreErrorKind::PreconditionFailed {
                    id: id.to_string(),
                    condition: precondition.to_string(),
                },
            ));
        }

        merge(&mut records[index], changes);
        Ok(records[index].clone())
    }
}

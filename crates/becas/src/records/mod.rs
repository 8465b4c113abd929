//! Generic accessor over the portal's REST record store.
//!
//! The store exposes one collection per entity and speaks plain JSON. Workflow services talk
//! to it through [`RecordStore`], so the same logic runs against the json-server style HTTP
//! backend ([`HttpRecordStore`]) and the in-process [`MemoryRecordStore`].

mod http;
mod memory;

use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use http::{HttpRecordStore, InvalidBaseUrl};
pub use memory::MemoryRecordStore;

/// Resource collections served by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Scholarships,
    Applications,
    Accounts,
    Notifications,
}

impl Collection {
    pub const fn path(self) -> &'static str {
        match self {
            Collection::Scholarships => "scholarships",
            Collection::Applications => "applications",
            Collection::Accounts => "accounts",
            Collection::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Store operation named in failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl StoreOperation {
    pub const fn label(self) -> &'static str {
        match self {
            StoreOperation::List => "list",
            StoreOperation::Get => "get",
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
            StoreOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure raised by any record store call.
#[derive(Debug, thiserror::Error)]
#[error("{operation} {collection} failed: {kind}")]
pub struct StoreError {
    pub operation: StoreOperation,
    pub collection: Collection,
    pub kind: StoreErrorKind,
}

impl StoreError {
    pub fn new(operation: StoreOperation, collection: Collection, kind: StoreErrorKind) -> Self {
        Self {
            operation,
            collection,
            kind,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StoreErrorKind::NotFound(_))
    }

    pub fn is_precondition_failed(&self) -> bool {
        matches!(self.kind, StoreErrorKind::PreconditionFailed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreErrorKind {
    #[error("record store responded with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed record: {0}")]
    Decode(String),
    #[error("record {0} not found")]
    NotFound(String),
    #[error("record {0} already exists")]
    Conflict(String),
    #[error("precondition failed on record {id}: {condition}")]
    PreconditionFailed { id: String, condition: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub const fn as_param(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Equality filters, ordering, and limit applied to a collection listing.
///
/// Field names may address nested values with dots (`evaluation.evaluator`). Filters compare
/// the textual form of the stored value, matching how json-server reads query strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    filters: Vec<(String, String)>,
    sort: Option<(String, SortOrder)>,
    limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string parameters understood by json-server.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some((field, order)) = &self.sort {
            pairs.push(("_sort".to_string(), field.clone()));
            pairs.push(("_order".to_string(), order.as_param().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("_limit".to_string(), limit.to_string()));
        }
        pairs
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.filters.iter().all(|(field, expected)| {
            lookup(record, field)
                .map(|value| text_of(value) == *expected)
                .unwrap_or(false)
        })
    }

    /// Filter, sort, and truncate an in-memory listing.
    pub fn apply(&self, records: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();

        if let Some((field, order)) = &self.sort {
            selected.sort_by(|left, right| {
                let ordering = compare_values(lookup(left, field), lookup(right, field));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Guard evaluated against the stored record before a conditional update is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    FieldEquals { field: String, value: Value },
    FieldNotIn { field: String, values: Vec<Value> },
}

impl Precondition {
    pub fn holds(&self, record: &Value) -> bool {
        match self {
            Precondition::FieldEquals { field, value } => lookup(record, field) == Some(value),
            Precondition::FieldNotIn { field, values } => match lookup(record, field) {
                Some(current) => !values.contains(current),
                None => true,
            },
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::FieldEquals { field, value } => write!(f, "{field} must equal {value}"),
            Precondition::FieldNotIn { field, values } => {
                let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "{field} must not be one of [{}]", rendered.join(", "))
            }
        }
    }
}

/// Storage abstraction over the REST collections.
pub trait RecordStore: Send + Sync {
    fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Value>, StoreError>;
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;
    /// Create a record. A missing `id` is assigned by the store.
    fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError>;
    /// Shallow-merge `changes` into the stored record and return the result.
    fn patch(&self, collection: Collection, id: &str, changes: Value) -> Result<Value, StoreError>;
    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Patch only while `precondition` holds for the stored record.
    ///
    /// The default reads, checks, then writes; another writer can still slip in between the
    /// two calls. Backends able to check and write in one step override it.
    fn patch_if(
        &self,
        collection: Collection,
        id: &str,
        precondition: &Precondition,
        changes: Value,
    ) -> Result<Value, StoreError> {
        let current = self.get(collection, id)?.ok_or_else(|| {
            StoreError::new(
                StoreOperation::Update,
                collection,
                StoreErrorKind::NotFound(id.to_string()),
            )
        })?;

        if !precondition.holds(&current) {
            return Err(StoreError::new(
                StoreOperation::Update,
                collection,
                StoreErrorKind::PreconditionFailed {
                    id: id.to_string(),
                    condition: precondition.to_string(),
                },
            ));
        }

        self.patch(collection, id, changes)
    }
}

/// Typed helpers layered over [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    fn list_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> Result<Vec<T>, StoreError> {
        self.list(collection, query)?
            .into_iter()
            .map(|value| decode(StoreOperation::List, collection, value))
            .collect()
    }

    fn get_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        self.get(collection, id)?
            .map(|value| decode(StoreOperation::Get, collection, value))
            .transpose()
    }

    fn create_as<T: Serialize + DeserializeOwned>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<T, StoreError> {
        let value = encode(StoreOperation::Create, collection, record)?;
        let stored = self.create(collection, value)?;
        decode(StoreOperation::Create, collection, stored)
    }

    fn patch_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
        changes: Value,
    ) -> Result<T, StoreError> {
        let stored = self.patch(collection, id, changes)?;
        decode(StoreOperation::Update, collection, stored)
    }

    fn patch_if_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
        precondition: &Precondition,
        changes: Value,
    ) -> Result<T, StoreError> {
        let stored = self.patch_if(collection, id, precondition, changes)?;
        decode(StoreOperation::Update, collection, stored)
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

pub fn encode<T: Serialize>(
    operation: StoreOperation,
    collection: Collection,
    record: &T,
) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|err| {
        StoreError::new(operation, collection, StoreErrorKind::Decode(err.to_string()))
    })
}

pub fn decode<T: DeserializeOwned>(
    operation: StoreOperation,
    collection: Collection,
    value: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|err| {
        StoreError::new(operation, collection, StoreErrorKind::Decode(err.to_string()))
    })
}

pub(crate) fn lookup<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

/// Textual form used for filter comparison and id normalisation.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(a), Some(b)) => text_of(a).cmp(&text_of(b)),
    }
}

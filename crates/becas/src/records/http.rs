use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{Collection, ListQuery, RecordStore, StoreError, StoreErrorKind, StoreOperation};

/// Base address that could not be turned into collection URLs.
#[derive(Debug, thiserror::Error)]
#[error("invalid record store url '{url}': {reason}")]
pub struct InvalidBaseUrl {
    pub url: String,
    pub reason: String,
}

/// Blocking client for a json-server style REST record store.
///
/// Conditional updates use the read-check-write default of [`RecordStore::patch_if`]; the
/// remote store offers no compare-and-set.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    base_url: Url,
    client: Client,
}

impl HttpRecordStore {
    pub fn new(base_url: &str) -> Result<Self, InvalidBaseUrl> {
        let parsed = Url::parse(base_url).map_err(|err| InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "url cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder().build().map_err(|err| InvalidBaseUrl {
            url: base_url.to_string(),
            reason: format!("http client unavailable: {}", error_chain(&err)),
        })?;

        Ok(Self {
            base_url: parsed,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn collection_url(&self, collection: Collection) -> Url {
        self.url_for(&[collection.path()])
    }

    pub fn record_url(&self, collection: Collection, id: &str) -> Url {
        self.url_for(&[collection.path(), id])
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(
        &self,
        operation: StoreOperation,
        collection: Collection,
        request: RequestBuilder,
    ) -> Result<Response, StoreError> {
        request.send().map_err(|err| {
            StoreError::new(
                operation,
                collection,
                StoreErrorKind::Transport(error_chain(&err)),
            )
        })
    }
}

/// Render an error with every `source()` below it, joined by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn read_json<T: DeserializeOwned>(
    operation: StoreOperation,
    collection: Collection,
    response: Response,
) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        return Err(StoreError::new(
            operation,
            collection,
            StoreErrorKind::Status(status.as_u16()),
        ));
    }

    response.json::<T>().map_err(|err| {
        StoreError::new(operation, collection, StoreErrorKind::Decode(err.to_string()))
    })
}

fn not_found(operation: StoreOperation, collection: Collection, id: &str) -> StoreError {
    StoreError::new(operation, collection, StoreErrorKind::NotFound(id.to_string()))
}

impl RecordStore for HttpRecordStore {
    fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, "listing records");
        let request = self.client.get(url).query(&query.query_pairs());
        let response = self.send(StoreOperation::List, collection, request)?;
        read_json(StoreOperation::List, collection, response)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let request = self.client.get(self.record_url(collection, id));
        let response = self.send(StoreOperation::Get, collection, request)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(StoreOperation::Get, collection, response).map(Some)
    }

    fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let request = self.client.post(self.collection_url(collection)).json(&record);
        let response = self.send(StoreOperation::Create, collection, request)?;
        read_json(StoreOperation::Create, collection, response)
    }

    fn patch(&self, collection: Collection, id: &str, changes: Value) -> Result<Value, StoreError> {
        let request = self
            .client
            .patch(self.record_url(collection, id))
            .json(&changes);
        let response = self.send(StoreOperation::Update, collection, request)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found(StoreOperation::Update, collection, id));
        }
        read_json(StoreOperation::Update, collection, response)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.record_url(collection, id));
        let response = self.send(StoreOperation::Delete, collection, request)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(not_found(StoreOperation::Delete, collection, id));
        }
        if !status.is_success() {
            return Err(StoreError::new(
                StoreOperation::Delete,
                collection,
                StoreErrorKind::Status(status.as_u16()),
            ));
        }
        Ok(())
    }
}

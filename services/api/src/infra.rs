use becas::config::{StoreBackend, StoreConfig};
use becas::error::AppError;
use becas::records::{HttpRecordStore, MemoryRecordStore, RecordStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the configured record store.
///
/// The HTTP backend wraps a blocking client, so callers inside a runtime must run this on the
/// blocking pool.
pub(crate) fn build_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, AppError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("using in-memory record store");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        StoreBackend::Http => {
            let store = HttpRecordStore::new(&config.base_url)?;
            info!(base_url = %store.base_url(), "using http record store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use becas::records::{Collection, ListQuery};

    #[test]
    fn memory_backend_starts_empty() {
        let store = build_store(&StoreConfig {
            backend: StoreBackend::Memory,
            base_url: StoreConfig::DEFAULT_BASE_URL.to_string(),
        })
        .expect("memory store");
        let listed = store
            .list(Collection::Scholarships, &ListQuery::new())
            .expect("lists");
        assert!(listed.is_empty());
    }

    #[test]
    fn http_backend_rejects_unparseable_urls() {
        let result = build_store(&StoreConfig {
            backend: StoreBackend::Http,
            base_url: "http://[::1".to_string(),
        });
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}

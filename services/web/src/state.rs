//! Application state shared across request handlers.

use std::sync::Arc;

use crate::db::SensorStore;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn SensorStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SensorStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store }),
        }
    }

    /// Get a reference to the sensor store.
    pub fn store(&self) -> &dyn SensorStore {
        self.inner.store.as_ref()
    }
}

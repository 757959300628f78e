use std::sync::Arc;

use lectern_store::DocumentStore;

use crate::settings::Settings;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: DocumentStore,
}

impl AppState {
    pub fn new(settings: Settings, store: DocumentStore) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
        }
    }
}

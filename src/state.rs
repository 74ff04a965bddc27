//! Shared application state for all routes. The model is immutable once resolved.

use crate::config::ResolvedModel;
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ResolvedModel>,
    /// Data-access collaborator; owns its own synchronization.
    pub store: Arc<dyn DataStore>,
}

impl AppState {
    pub fn new(model: ResolvedModel, store: Arc<dyn DataStore>) -> Self {
        AppState {
            model: Arc::new(model),
            store,
        }
    }
}

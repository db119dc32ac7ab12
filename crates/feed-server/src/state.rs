use crate::store::{Seed, Store};
use feed_core::permission::PermissionGate;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Incidents returned per page when the query names no limit.
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub gate: Arc<dyn PermissionGate + Send + Sync>,
    pub page_size: usize,
}

impl AppState {
    pub fn new(store: Store, gate: impl PermissionGate + Send + Sync + 'static) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            gate: Arc::new(gate),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Store and policy engine both come from the seed.
    pub fn from_seed(seed: Seed) -> Self {
        let policy = seed.policy.clone();
        Self::new(Store::from_seed(seed), policy)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

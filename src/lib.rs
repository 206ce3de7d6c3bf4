pub mod config;
pub mod rest;
pub mod store;
pub mod tasks;

use std::sync::Arc;

use config::TaskdConfig;
use store::Store;
use tasks::TaskService;

/// Shared application state passed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TaskdConfig>,
    pub store: Arc<Store>,
    pub tasks: Arc<TaskService>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire the context from an already-opened store.
    ///
    /// The store pool is created once in `main` and injected here; handlers
    /// never open their own connections.
    pub fn new(config: TaskdConfig, store: Store) -> Self {
        let store = Arc::new(store);
        Self {
            config: Arc::new(config),
            tasks: Arc::new(TaskService::new(Arc::clone(&store))),
            store,
            started_at: std::time::Instant::now(),
        }
    }
}

pub mod config;
pub mod rest;
pub mod storage;
pub mod tasks;

use std::sync::Arc;

use config::ServiceConfig;
use tasks::TaskService;

/// Shared application state passed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServiceConfig>,
    /// Task CRUD service over the injected store.
    pub tasks: TaskService,
    pub started_at: std::time::Instant,
}

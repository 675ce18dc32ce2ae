// Shared application state handed to every route.

use std::sync::Arc;

use gateway_core::{GatewayConfig, Repository};
use gateway_storage::Database;
use tokio::sync::Semaphore;

use crate::mcp::McpToolClient;

/// Bounds how many background quota-update tasks may be in flight at once.
const MAX_IN_FLIGHT_USAGE_UPDATES: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    /// The same connection pool as `repo`, typed concretely so admin
    /// routes can reach the inherent `Database` methods (prompt
    /// versioning, agent CRUD) that aren't part of `Repository`.
    pub db: Arc<Database>,
    pub config: Arc<GatewayConfig>,
    pub mcp: Arc<dyn McpToolClient>,
    pub usage_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Arc<GatewayConfig>, mcp: Arc<dyn McpToolClient>) -> Self {
        Self {
            repo: db.clone(),
            db,
            config,
            mcp,
            usage_permits: Arc::new(Semaphore::new(MAX_IN_FLIGHT_USAGE_UPDATES)),
        }
    }
}

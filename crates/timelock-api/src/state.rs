//! Application state shared across handlers

use std::sync::Arc;
use timelock_service::EscrowLifecycleService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Escrow orchestration over the shared ledger connection
    pub service: Arc<EscrowLifecycleService>,
}

impl AppState {
    pub fn new(service: Arc<EscrowLifecycleService>) -> Self {
        Self { service }
    }
}

//! Shared handler state.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use notehub_core::ConnectionRegistry;
use notehub_service::Services;
use notehub_store::Store;

use crate::config::{ServerConfig, MIN_PING_INTERVAL};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Open WebSocket connections across all notes.
    pub ws_connections: Arc<AtomicUsize>,
    pub ping_interval: Duration,
}

impl AppState {
    /// Build state over `store` with a fresh connection registry.
    pub fn new(store: &Store, config: &ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.subscriber_buffer));
        Self {
            services: Services::new(store, registry),
            ws_connections: Arc::new(AtomicUsize::new(0)),
            ping_interval: config.ws_ping_interval.max(MIN_PING_INTERVAL),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.services.registry
    }
}

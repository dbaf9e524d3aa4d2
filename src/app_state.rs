//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::{ChannelDirectory, ConnectionRegistry};
use crate::service::{DeliveryEngine, IngressGateway, SessionManager};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingress gateway for publishes, upgrades, and channel queries.
    pub gateway: Arc<IngressGateway>,
    /// Configuration the relay was started with.
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Wires the relay components for one process.
    ///
    /// The directory and registry are owned here and passed down by
    /// reference-counted handle; there is no global state.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let directory = Arc::new(ChannelDirectory::new());
        let registry = Arc::new(ConnectionRegistry::new(directory));
        let delivery = Arc::new(DeliveryEngine::new(Arc::clone(&registry)));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&registry),
            Arc::clone(&delivery),
            config.session_options(),
        ));
        let gateway = Arc::new(IngressGateway::new(
            registry,
            delivery,
            sessions,
            config.publish_limits(),
        ));

        Self {
            gateway,
            config: Arc::new(config),
        }
    }
}

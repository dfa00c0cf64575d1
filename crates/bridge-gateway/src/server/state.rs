//! Gateway state
//!
//! Application state shared by both listeners and the web surface.

use crate::auth::{OperatorAuthorizer, SessionAuthorizer};
use crate::broadcast::RelayHub;
use crate::connection::ConnectionRegistry;
use bridge_common::{AppConfig, IdentityProvider, RelayConfig, SessionService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Gateway application state
///
/// Holds all shared dependencies for the relay server. The registry is owned
/// here and handed to listeners and the hub; there is no global state.
#[derive(Clone)]
pub struct GatewayState {
    /// Relay hub (owns the connection registry)
    hub: Arc<RelayHub>,
    /// Issues operator session tokens
    sessions: Arc<SessionService>,
    /// Capability check for operator requests
    authorizer: Arc<dyn OperatorAuthorizer>,
    /// OAuth2 identity provider
    identity: Arc<dyn IdentityProvider>,
    /// Application configuration
    config: Arc<AppConfig>,
    /// Flipped to `true` once the server starts shutting down
    shutdown: Arc<watch::Sender<bool>>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(config: AppConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let sessions = SessionService::new(&config.session.secret, config.session.ttl_secs);
        let authorizer = Arc::new(SessionAuthorizer::new(sessions.clone()));

        Self::build(config, identity, sessions, authorizer)
    }

    /// Create a gateway state with a custom capability check
    pub fn with_authorizer(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        authorizer: Arc<dyn OperatorAuthorizer>,
    ) -> Self {
        let sessions = SessionService::new(&config.session.secret, config.session.ttl_secs);

        Self::build(config, identity, sessions, authorizer)
    }

    fn build(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        sessions: SessionService,
        authorizer: Arc<dyn OperatorAuthorizer>,
    ) -> Self {
        Self {
            hub: Arc::new(RelayHub::new(ConnectionRegistry::new_shared())),
            sessions: Arc::new(sessions),
            authorizer,
            identity,
            config: Arc::new(config),
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Get the relay hub
    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        self.hub.registry()
    }

    /// Get the session service
    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Get the operator capability check
    pub fn authorizer(&self) -> &dyn OperatorAuthorizer {
        self.authorizer.as_ref()
    }

    /// Get the identity provider
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the relay dispatch settings
    pub fn relay(&self) -> &RelayConfig {
        &self.config.relay
    }

    /// Upper bound for a single transport write
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.config.relay.write_timeout_ms)
    }

    /// Ask listeners and open sessions to wind down
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Check if shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that changes when shutdown begins
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", self.registry())
            .field("config", &"AppConfig")
            .finish()
    }
}

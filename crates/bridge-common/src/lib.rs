//! # bridge-common
//!
//! Shared utilities including configuration, error handling, operator sessions, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    generate_oauth_state, DiscordProvider, IdentityProvider, OperatorPrincipal, SessionClaims,
    SessionService,
};
pub use config::{
    AppConfig, AppSettings, ConfigError, DiscordConfig, Environment, RelayConfig, ServerConfig,
    SessionConfig, WebConfig,
};
pub use error::{AppError, ErrorResponse};
pub use telemetry::{try_init_tracing_with_config, TracingConfig, TracingError};

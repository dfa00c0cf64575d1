//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p bridge-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use bridge_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        web = %config.web.server.address(),
        game = %config.game.address(),
        "Configuration loaded"
    );

    if let Err(e) = bridge_gateway::run(config).await {
        error!(error = %e, "Relay failed");
        std::process::exit(1);
    }
}

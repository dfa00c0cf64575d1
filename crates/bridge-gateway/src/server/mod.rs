//! Relay server setup
//!
//! Binds both listeners, wires the operator routes and runs until shutdown.

mod state;

pub use state::GatewayState;

use crate::listener::{operator_handler, run_game_listener};
use crate::web::{
    asset_router, discord_callback, discord_login, health_check, login_page, logout, me,
};
use axum::{routing::get, Router};
use bridge_common::{AppConfig, AppError, DiscordProvider};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the operator router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login_page))
        .route("/auth/discord", get(discord_login))
        .route("/auth/discord/callback", get(discord_callback))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/events", get(operator_handler))
}

/// Build the complete operator application
///
/// Anything not routed falls through to the protected static assets.
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .merge(asset_router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Both listeners, bound and ready to serve
#[derive(Debug)]
pub struct RelayServer {
    state: GatewayState,
    web_listener: TcpListener,
    game_listener: TcpListener,
}

impl RelayServer {
    /// Bind the operator and game listeners
    ///
    /// # Errors
    /// Returns an error if either address cannot be bound
    pub async fn bind(state: GatewayState) -> Result<Self, AppError> {
        let web_listener = bind_listener(&state.config().web.server.address()).await?;
        let game_listener = bind_listener(&state.config().game.address()).await?;

        Ok(Self {
            state,
            web_listener,
            game_listener,
        })
    }

    /// Get the gateway state
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Local address of the operator listener
    ///
    /// # Errors
    /// Returns an error if the socket address cannot be read
    pub fn web_addr(&self) -> Result<SocketAddr, AppError> {
        self.web_listener.local_addr().map_err(AppError::internal)
    }

    /// Local address of the game listener
    ///
    /// # Errors
    /// Returns an error if the socket address cannot be read
    pub fn game_addr(&self) -> Result<SocketAddr, AppError> {
        self.game_listener.local_addr().map_err(AppError::internal)
    }

    /// Serve both listeners until `signal` completes
    ///
    /// # Errors
    /// Returns an error if the operator server fails
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let web_addr = self.web_addr()?;
        let game_addr = self.game_addr()?;
        let state = self.state.clone();

        let game = tokio::spawn(run_game_listener(self.game_listener, state.clone()));

        tracing::info!("Minecraft listener on ws://{}", game_addr);
        tracing::info!("Web admin listening on http://{}", web_addr);

        let app = create_app(self.state);
        let on_signal = state.clone();
        let result = axum::serve(self.web_listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                on_signal.begin_shutdown();
            })
            .await;

        // Also reached when the web server fails; open sessions close either way
        state.begin_shutdown();
        let _ = game.await;

        result.map_err(AppError::internal)
    }
}

async fn bind_listener(addr: &str) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::bind(addr, e))
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

/// Run the relay with configuration
///
/// # Errors
/// Returns an error if a listener cannot be bound or the server fails
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let identity = Arc::new(DiscordProvider::new(config.discord.clone())?);
    let state = GatewayState::new(config, identity);

    let server = RelayServer::bind(state).await?;
    server.serve_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

//! Front-end assets
//!
//! The operator panel is served from a directory, and only to authorized
//! sessions.

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use tower_http::services::ServeDir;

use super::extractors::LOGIN_PATH;
use crate::server::GatewayState;

/// Fallback router serving the configured static directory
pub fn asset_router(state: &GatewayState) -> Router<GatewayState> {
    Router::new()
        .fallback_service(ServeDir::new(&state.config().web.static_dir))
        .layer(middleware::from_fn_with_state(state.clone(), require_operator))
}

/// Let authorized operators through, send everyone else to the login page
pub async fn require_operator(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    if state.authorizer().authorize(request.headers()).is_some() {
        next.run(request).await
    } else {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

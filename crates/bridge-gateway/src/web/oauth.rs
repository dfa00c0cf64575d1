//! Discord login flow
//!
//! Authorization-code flow with an anti-forgery `state` kept in a short-lived
//! cookie. A successful callback ends with an operator session cookie.

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bridge_common::{generate_oauth_state, AppError};
use serde::Deserialize;

use super::extractors::LOGIN_PATH;
use super::ApiError;
use crate::auth::{OAUTH_STATE_COOKIE, SESSION_COOKIE};
use crate::server::GatewayState;

/// Path scope of the OAuth state cookie
const OAUTH_COOKIE_PATH: &str = "/auth";

/// Query parameters Discord sends to the callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn cookie<'c>(state: &GatewayState, name: &'c str, value: String, path: &'c str) -> Cookie<'c> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().app.env.is_production())
        .build()
}

/// Start the login flow
pub async fn discord_login(
    State(state): State<GatewayState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let oauth_state = generate_oauth_state();
    let url = state.identity().authorize_url(&oauth_state)?;

    let jar = jar.add(cookie(&state, OAUTH_STATE_COOKIE, oauth_state, OAUTH_COOKIE_PATH));
    Ok((jar, Redirect::to(&url)))
}

/// Finish the login flow
///
/// Any failure sends the browser back to the login page.
pub async fn discord_callback(
    State(state): State<GatewayState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path(OAUTH_COOKIE_PATH));

    match complete_login(&state, expected, params).await {
        Ok(token) => {
            let jar = jar.add(cookie(&state, SESSION_COOKIE, token, "/"));
            (jar, Redirect::to("/"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Discord login failed");
            (jar, Redirect::to(LOGIN_PATH))
        }
    }
}

async fn complete_login(
    state: &GatewayState,
    expected_state: Option<String>,
    params: CallbackParams,
) -> Result<String, AppError> {
    if let Some(error) = params.error {
        return Err(AppError::identity_provider(error));
    }

    match (expected_state, params.state) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => return Err(AppError::OAuthStateMismatch),
    }

    let code = params
        .code
        .ok_or_else(|| AppError::identity_provider("missing authorization code"))?;

    let principal = state.identity().resolve_identity(&code).await?;
    tracing::info!(operator = %principal.username, user_id = %principal.id, "Operator logged in");

    state.sessions().issue(&principal)
}

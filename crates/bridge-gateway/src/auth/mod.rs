//! Operator capability check
//!
//! Decides, once per request, whether an operator session is authorized and
//! who it belongs to.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use bridge_common::{OperatorPrincipal, SessionService};

/// Cookie carrying the operator session token
pub const SESSION_COOKIE: &str = "mc_bridge_session";

/// Cookie carrying the pending OAuth `state`
pub const OAUTH_STATE_COOKIE: &str = "mc_bridge_oauth_state";

/// Capability check for operator sessions
pub trait OperatorAuthorizer: Send + Sync {
    /// The principal behind the request, or `None` if it is not authorized
    fn authorize(&self, headers: &HeaderMap) -> Option<OperatorPrincipal>;
}

/// Authorizes requests carrying a valid session token
#[derive(Debug, Clone)]
pub struct SessionAuthorizer {
    sessions: SessionService,
}

impl SessionAuthorizer {
    pub fn new(sessions: SessionService) -> Self {
        Self { sessions }
    }

    fn verify(&self, token: &str) -> Option<OperatorPrincipal> {
        match self.sessions.verify(token) {
            Ok(claims) => Some(claims.principal()),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected operator session");
                None
            }
        }
    }
}

impl OperatorAuthorizer for SessionAuthorizer {
    fn authorize(&self, headers: &HeaderMap) -> Option<OperatorPrincipal> {
        cookie_token(headers)
            .into_iter()
            .chain(bearer_token(headers))
            .find_map(|token| self.verify(&token))
    }
}

/// Session cookie set by the login flow
fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Bearer token for non-browser tools, also tried when the cookie is stale
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

//! Operator extractor
//!
//! Resolves the authorized operator for a request, redirecting to the login
//! page when there is none.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use bridge_common::OperatorPrincipal;

use crate::server::GatewayState;

/// Where unauthenticated browsers are sent
pub(crate) const LOGIN_PATH: &str = "/login";

/// Authenticated operator behind the request
#[derive(Debug, Clone)]
pub struct Operator(pub OperatorPrincipal);

#[async_trait]
impl<S> FromRequestParts<S> for Operator
where
    S: Send + Sync,
    GatewayState: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = GatewayState::from_ref(state);

        state
            .authorizer()
            .authorize(&parts.headers)
            .map(Operator)
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}

//! Plain pages and operator identity

use axum::response::{Html, Redirect};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;

use super::extractors::LOGIN_PATH;
use super::Operator;
use crate::auth::SESSION_COOKIE;

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Login</title></head>
  <body style="background:#121212;color:#eee;font-family:sans-serif;text-align:center;padding:3rem;">
    <h1>Login with Discord</h1>
    <a href="/auth/discord"><button style="font-size:1.2rem;padding:1rem 2rem;cursor:pointer;">Login with Discord</button></a>
  </body>
</html>
"#;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Login page
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// End the operator session
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to(LOGIN_PATH))
}

/// Identity of the logged-in operator
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub discriminator: Option<String>,
    pub id: String,
}

/// Who am I
pub async fn me(Operator(principal): Operator) -> Json<MeResponse> {
    Json(MeResponse {
        username: principal.username,
        discriminator: principal.discriminator,
        id: principal.id,
    })
}

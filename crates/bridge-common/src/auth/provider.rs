//! OAuth2 identity provider
//!
//! Resolves an authorization code into an operator identity. Discord is the
//! production provider; the trait lets tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde::Deserialize;

use super::OperatorPrincipal;
use crate::config::DiscordConfig;
use crate::error::AppError;

/// Scopes requested from Discord
const DISCORD_SCOPES: &str = "identify guilds";

/// Timeout for calls to the provider API
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of the anti-forgery `state` parameter
const OAUTH_STATE_LEN: usize = 32;

/// An OAuth2 authorization-code provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to in order to log in
    fn authorize_url(&self, state: &str) -> Result<String, AppError>;

    /// Exchange an authorization code for the operator's identity
    async fn resolve_identity(&self, code: &str) -> Result<OperatorPrincipal, AppError>;
}

/// Generate a random `state` value for an authorization request
pub fn generate_oauth_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    #[serde(default)]
    discriminator: Option<String>,
}

impl From<DiscordUser> for OperatorPrincipal {
    fn from(user: DiscordUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            discriminator: user.discriminator,
        }
    }
}

/// Discord OAuth2 provider
pub struct DiscordProvider {
    http: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordProvider {
    /// Create a provider for the configured Discord application
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: DiscordConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(AppError::internal)?;

        Ok(Self { http, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.callback_url.as_str()),
        ];

        self.http
            .post(self.api_url("/oauth2/token"))
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(AppError::identity_provider)?
            .json()
            .await
            .map_err(AppError::identity_provider)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<DiscordUser, AppError> {
        self.http
            .get(self.api_url("/users/@me"))
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(AppError::identity_provider)?
            .json()
            .await
            .map_err(AppError::identity_provider)
    }
}

#[async_trait]
impl IdentityProvider for DiscordProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("scope", DISCORD_SCOPES),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("state", state),
            ],
        )
        .map_err(AppError::internal)?;

        Ok(url.into())
    }

    async fn resolve_identity(&self, code: &str) -> Result<OperatorPrincipal, AppError> {
        let token = self.exchange_code(code).await?;
        let user = self.fetch_user(&token.access_token).await?;

        tracing::debug!(user_id = %user.id, username = %user.username, "Resolved Discord identity");

        Ok(user.into())
    }
}

impl std::fmt::Debug for DiscordProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordProvider")
            .field("client_id", &self.config.client_id)
            .field("api_base", &self.config.api_base)
            .finish_non_exhaustive()
    }
}

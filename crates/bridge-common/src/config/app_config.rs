//! Application configuration structs
//!
//! Loads configuration from environment variables. Values are read once at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub web: WebConfig,
    pub game: ServerConfig,
    pub discord: DiscordConfig,
    pub session: SessionConfig,
    pub relay: RelayConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Bind address for a listener
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Operator web surface: event channel, login flow and front-end assets
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub server: ServerConfig,
    pub static_dir: PathBuf,
}

/// Discord OAuth2 application settings
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub api_base: String,
    pub authorize_url: String,
}

/// Operator session token settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

/// Relay dispatch tuning
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Upper bound for a single transport write
    pub write_timeout_ms: u64,
}

// Default value functions
fn default_app_name() -> String {
    "mc-bridge".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3001
}

fn default_game_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_discord_api_base() -> String {
    "https://discord.com/api".to_string()
}

fn default_discord_authorize_url() -> String {
    "https://discord.com/oauth2/authorize".to_string()
}

fn default_session_ttl() -> i64 {
    86_400 // 24 hours
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_write_timeout_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    /// Returns an error if required variables are missing or malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: match vars.get("APP_ENV") {
                    Some(value) => Environment::parse(&value)
                        .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
                    None => default_env(),
                },
            },
            web: WebConfig {
                server: ServerConfig {
                    host: vars.get("WEB_HOST").unwrap_or_else(default_host),
                    port: vars.parse_or("WEB_PORT", default_web_port)?,
                },
                static_dir: vars
                    .get("STATIC_DIR")
                    .map_or_else(default_static_dir, PathBuf::from),
            },
            game: ServerConfig {
                host: vars.get("MC_WS_IP").unwrap_or_else(default_host),
                port: vars.parse_or("MC_WS_PORT", default_game_port)?,
            },
            discord: DiscordConfig {
                client_id: vars.require("DISCORD_CLIENT_ID")?,
                client_secret: vars.require("DISCORD_CLIENT_SECRET")?,
                callback_url: vars.require("DISCORD_CALLBACK_URL")?,
                api_base: vars
                    .get("DISCORD_API_BASE")
                    .unwrap_or_else(default_discord_api_base),
                authorize_url: vars
                    .get("DISCORD_AUTHORIZE_URL")
                    .unwrap_or_else(default_discord_authorize_url),
            },
            session: SessionConfig {
                secret: vars.require("SESSION_SECRET")?,
                ttl_secs: vars.parse_or("SESSION_TTL_SECS", default_session_ttl)?,
            },
            relay: RelayConfig {
                outbound_buffer: vars.parse_or("RELAY_OUTBOUND_BUFFER", default_outbound_buffer)?,
                write_timeout_ms: vars
                    .parse_or("RELAY_WRITE_TIMEOUT_MS", default_write_timeout_ms)?,
            },
        })
    }
}

/// Variable lookup with the parsing rules shared by every setting
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Empty values count as unset
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingVar(key))
    }

    fn parse_or<T: FromStr>(
        &self,
        key: &'static str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw)),
            None => Ok(default()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

use std::env;

use auth::TokenSettings;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Value of `database.url` selecting the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub token: TokenConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Signing secret, issuer and lifetimes (seconds) of issued credentials.
#[derive(Deserialize, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_expires_in: i64,
    pub refresh_token_expires_in: i64,
    pub auth_code_expires_in: i64,
    pub app_token_expires_in: i64,
    /// Public base URL of the service, reported by the info endpoint.
    pub url: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("issuer", &self.issuer)
            .field("access_token_expires_in", &self.access_token_expires_in)
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .field("auth_code_expires_in", &self.auth_code_expires_in)
            .field("app_token_expires_in", &self.app_token_expires_in)
            .field("url", &self.url)
            .finish()
    }
}

impl TokenConfig {
    pub fn auth_code_ttl(&self) -> Duration {
        Duration::seconds(self.auth_code_expires_in)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Message(
                "token.secret must not be empty".to_string(),
            ));
        }

        for (key, seconds) in [
            ("token.access_token_expires_in", self.access_token_expires_in),
            ("token.refresh_token_expires_in", self.refresh_token_expires_in),
            ("token.auth_code_expires_in", self.auth_code_expires_in),
            ("token.app_token_expires_in", self.app_token_expires_in),
        ] {
            if seconds <= 0 {
                return Err(ConfigError::Message(format!(
                    "{} must be positive, got {}",
                    key, seconds
                )));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKEN__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.token.validate()?;

        Ok(config)
    }

    /// Immutable signing configuration for the authenticator.
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings::new(
            self.token.secret.as_bytes(),
            self.token.issuer.as_str(),
            Duration::seconds(self.token.access_token_expires_in),
            Duration::seconds(self.token.refresh_token_expires_in),
            Duration::seconds(self.token.app_token_expires_in),
        )
    }
}

//! Layered server configuration.
//!
//! Sources, later ones winning: `config/default.toml`, `config/local.toml`,
//! an optional `--config` file, then `PAYGATE__SECTION__KEY` environment
//! variables.

use paygate_billing::{StripeConfig, WebhookVerifier};
use paygate_core::keys::MIN_KEY_BYTES;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub stripe: StripeSettings,
    pub keys: KeySettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL customers reach us on; checkout redirects back here.
    pub public_url: String,
    /// Serve `/mock/db`.
    pub expose_store: bool,
    /// Seconds a new key stays collectable on the success page.
    pub reveal_ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            expose_store: false,
            reveal_ttl_seconds: 900,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StripeSettings {
    pub secret_key: String,
    pub price_id: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub webhook_secret: Option<String>,
    /// Trust unsigned webhook payloads when no secret is set. Insecure.
    pub allow_unsigned_webhooks: bool,
    pub signature_tolerance_seconds: u64,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            price_id: String::new(),
            api_base: paygate_billing::client::DEFAULT_API_BASE.to_string(),
            timeout_seconds: 30,
            webhook_secret: None,
            allow_unsigned_webhooks: false,
            signature_tolerance_seconds: 300,
        }
    }
}

impl fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeSettings")
            .field("secret_key", &mask(Some(&self.secret_key)))
            .field("price_id", &self.price_id)
            .field("api_base", &self.api_base)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("webhook_secret", &mask(self.webhook_secret.as_deref()))
            .field("allow_unsigned_webhooks", &self.allow_unsigned_webhooks)
            .field(
                "signature_tolerance_seconds",
                &self.signature_tolerance_seconds,
            )
            .finish()
    }
}

fn mask(secret: Option<&str>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "***",
        _ => "(not set)",
    }
}

impl StripeSettings {
    /// Client settings. Requires a secret key.
    pub fn client_config(&self) -> Result<StripeConfig, ConfigError> {
        if self.secret_key.is_empty() {
            return Err(ConfigError::Invalid(
                "stripe.secret_key is required (PAYGATE__STRIPE__SECRET_KEY)".to_string(),
            ));
        }
        if self.price_id.is_empty() {
            return Err(ConfigError::Invalid(
                "stripe.price_id is required (PAYGATE__STRIPE__PRICE_ID)".to_string(),
            ));
        }

        Ok(StripeConfig::new(&self.secret_key)
            .with_api_base(&self.api_base)
            .with_timeout(Duration::from_secs(self.timeout_seconds)))
    }

    /// How webhooks are authenticated.
    ///
    /// Without a secret, unsigned payloads are only accepted when
    /// `allow_unsigned_webhooks` is set explicitly.
    pub fn webhook_verifier(&self) -> Result<WebhookVerifier, ConfigError> {
        match self.webhook_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(WebhookVerifier::signed(secret)
                .with_tolerance(Duration::from_secs(self.signature_tolerance_seconds))),
            _ if self.allow_unsigned_webhooks => Ok(WebhookVerifier::Unsigned),
            _ => Err(ConfigError::Invalid(
                "stripe.webhook_secret is not set; set it, or set \
                 stripe.allow_unsigned_webhooks = true for insecure local development"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    /// Random bytes per API key.
    pub key_bytes: usize,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            key_bytes: MIN_KEY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl AppConfig {
    /// Load configuration from files and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PAYGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> Result<Self, ConfigError> {
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.key_bytes < MIN_KEY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "keys.key_bytes must be at least {}",
                MIN_KEY_BYTES
            )));
        }

        if self.server.reveal_ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "server.reveal_ttl_seconds must be positive".to_string(),
            ));
        }

        url::Url::parse(&self.server.public_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "server.public_url {:?} is not a URL: {}",
                self.server.public_url, e
            ))
        })?;

        Ok(())
    }
}

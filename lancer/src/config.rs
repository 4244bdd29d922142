//! Receiver configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file
//! path defaults to `lancer.yaml` but can be specified via `-f` flag or `LANCER_CONFIG`
//! environment variable. A missing file is not an error; every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `lancer.yaml`)
//! 2. **Environment variables** - Variables prefixed with `LANCER_` override YAML values
//! 3. **WEBHOOK_SECRET** - Special case: overrides `webhook_secret` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `LANCER_WEBHOOKS__VERIFICATION=false` sets the `webhooks.verification` field.
//!
//! ## Example
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 3002
//! webhook_secret: whsec-change-me
//! webhooks:
//!   path: /webhooks
//!   verification: true
//!   canonicalization: raw_body   # or `reserialized` (compact re-encoding of the parsed body)
//!   body_limit: 2097152
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::webhooks::{Canonicalization, DEFAULT_BODY_LIMIT};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "LANCER_CONFIG", default_value = "lancer.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main receiver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Shared secret senders sign webhooks with. Required when verification is on.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    /// Webhook endpoint configuration
    pub webhooks: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// Route the receiver is mounted on
    pub path: String,
    /// Check `x-signature` on every delivery
    pub verification: bool,
    /// Which payload bytes senders sign
    pub canonicalization: Canonicalization,
    /// Largest accepted body, in bytes
    pub body_limit: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: "/webhooks".to_string(),
            verification: true,
            canonicalization: Canonicalization::RawBody,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            webhook_secret: None,
            webhooks: WebhookConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.webhooks.verification && self.webhook_secret.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config {
                message: "Webhook verification is enabled but webhook_secret is not configured. \
                          Please set WEBHOOK_SECRET or LANCER_WEBHOOK_SECRET, or add webhook_secret to the config file."
                    .to_string(),
            });
        }

        if !self.webhooks.path.starts_with('/') {
            return Err(Error::Config {
                message: format!("webhooks.path must start with '/', got '{}'", self.webhooks.path),
            });
        }

        if self.webhooks.body_limit == 0 {
            return Err(Error::Config {
                message: "webhooks.body_limit cannot be 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // LANCER_CONFIG names the file itself, not a field
            .merge(Env::prefixed("LANCER_").split("__").ignore(&["config"]))
            .merge(Env::raw().only(&["WEBHOOK_SECRET"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

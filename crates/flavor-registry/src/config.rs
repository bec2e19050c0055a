//! Configuration management for the Flavor Registry
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use flavor_common::ProviderType;
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL; flavors are kept in memory when unset
    pub redis_url: Option<String>,

    /// JSON file overriding the built-in provider defaults
    pub defaults_file: Option<PathBuf>,

    /// Providers registered at startup
    pub providers: Vec<(String, ProviderType)>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("REGISTRY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("REGISTRY_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid REGISTRY_PORT")?,

            redis_url: non_empty_var("REDIS_URL"),

            defaults_file: non_empty_var("FLAVOR_DEFAULTS_FILE").map(PathBuf::from),

            providers: match non_empty_var("PROVIDERS") {
                Some(spec) => parse_providers(&spec).context("Invalid PROVIDERS")?,
                None => Vec::new(),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("REGISTRY_PORT must be greater than 0");
        }

        if let Some(path) = &self.defaults_file {
            if !path.is_file() {
                anyhow::bail!("FLAVOR_DEFAULTS_FILE does not exist: {}", path.display());
            }
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a provider seed list of the form `id:type,id:type`
pub fn parse_providers(spec: &str) -> Result<Vec<(String, ProviderType)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_provider_entry)
        .collect()
}

fn parse_provider_entry(entry: &str) -> Result<(String, ProviderType)> {
    let (id, provider_type) = entry
        .split_once(':')
        .with_context(|| format!("expected id:type, got '{}'", entry))?;

    let id = id.trim();
    if id.is_empty() {
        anyhow::bail!("empty provider id in '{}'", entry);
    }

    let provider_type = provider_type
        .parse::<ProviderType>()
        .map_err(anyhow::Error::msg)?;

    Ok((id.to_string(), provider_type))
}

//! # Configuration Management
//!
//! Environment-driven configuration for building a [`Token`].
//!
//! # Environment Variables
//!
//! - `VAULT_ADDR`: Vault address (required)
//! - `VAULT_NAMESPACE`: Vault Enterprise namespace
//! - `VAULT_AUTH_MOUNT`: EC2 auth method mount (default: "aws-ec2")
//! - `VAULT_SECRETS_MOUNT`: Consul secrets engine mount (default: "consul")
//! - `CONSUL_HTTP_ADDR`: Consul address (default: "http://127.0.0.1:8500")
//! - `CONSUL_TOKEN_ROLE`: role to request credentials for
//! - `CONSUL_TOKEN_STRATEGY`: "ec2" (default) or "static"
//! - `VAULT_TOKEN`: broker token for the static strategy
//! - `VAULT_NONCE` / `VAULT_NONCE_PATH`: nonce override / nonce file
//! - `EC2_METADATA_URL`: identity document endpoint
//! - `CONSUL_TOKEN_HTTP_TIMEOUT_SECS`: per-request timeout (default: 10)
//! - `CONSUL_TOKEN_LOG_LEVEL` / `CONSUL_TOKEN_LOG_JSON`: logging

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::credentials::metadata::{DEFAULT_METADATA_URL, DEFAULT_NONCE_PATH};
use crate::credentials::{
    BrokerConfig, ConsulRegistry, Credential, MetadataStrategy, MetadataStrategyConfig,
    RegistryConfig, RegistryValidator, Result, StaticStrategy, Strategy, Token, TokenError, VaultBroker,
};

/// How the process proves its identity to Vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Pre-issued Vault token
    Static,
    /// EC2 instance identity document
    Ec2,
}

impl StrategyKind {
    /// Name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Ec2 => "ec2",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "ec2" | "aws-ec2" => Ok(Self::Ec2),
            _ => Err(format!("Unknown identity strategy: {}", s)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Vault address
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub vault_addr: String,

    /// Vault namespace
    pub vault_namespace: Option<String>,

    /// EC2 auth method mount
    #[validate(length(min = 1, message = "Auth mount cannot be empty"))]
    pub auth_mount: String,

    /// Consul secrets engine mount
    #[validate(length(min = 1, message = "Secrets mount cannot be empty"))]
    pub secrets_mount: String,

    /// Consul address
    #[validate(length(min = 1, message = "Consul address cannot be empty"))]
    pub consul_addr: String,

    /// Role to request credentials for; empty disables renewal
    pub role: String,

    /// Identity strategy
    pub strategy: StrategyKind,

    /// Static Vault token (static strategy only)
    pub vault_token: Option<Credential>,

    /// Explicit nonce (ec2 strategy only)
    pub nonce: Option<Credential>,

    /// Nonce file (ec2 strategy only)
    pub nonce_path: PathBuf,

    /// Identity document endpoint (ec2 strategy only)
    #[validate(length(min = 1, message = "Metadata URL cannot be empty"))]
    pub metadata_url: String,

    /// Per-request HTTP timeout in seconds
    #[validate(range(min = 1, max = 300, message = "HTTP timeout must be between 1 and 300 seconds"))]
    pub http_timeout_seconds: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_addr: "http://127.0.0.1:8200".to_string(),
            vault_namespace: None,
            auth_mount: "aws-ec2".to_string(),
            secrets_mount: "consul".to_string(),
            consul_addr: "http://127.0.0.1:8500".to_string(),
            role: String::new(),
            strategy: StrategyKind::Ec2,
            vault_token: None,
            nonce: None,
            nonce_path: PathBuf::from(DEFAULT_NONCE_PATH),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            http_timeout_seconds: 10,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Config`] if `VAULT_ADDR` is missing or a value does not parse
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let vault_addr = lookup("VAULT_ADDR")
            .ok_or_else(|| TokenError::config_error("VAULT_ADDR environment variable not set"))?;

        let strategy: StrategyKind = match lookup("CONSUL_TOKEN_STRATEGY") {
            Some(value) => value.parse().map_err(TokenError::config_error)?,
            None => defaults.strategy,
        };

        let http_timeout_seconds: u64 = match lookup("CONSUL_TOKEN_HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse()
                .map_err(|e| TokenError::config_error(format!("Invalid HTTP timeout: {}", e)))?,
            None => defaults.http_timeout_seconds,
        };

        let json_logging = match lookup("CONSUL_TOKEN_LOG_JSON") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| TokenError::config_error(format!("Invalid boolean: {}", value)))?,
            None => defaults.logging.json_logging,
        };

        let config = Self {
            vault_addr,
            vault_namespace: lookup("VAULT_NAMESPACE"),
            auth_mount: lookup("VAULT_AUTH_MOUNT").unwrap_or(defaults.auth_mount),
            secrets_mount: lookup("VAULT_SECRETS_MOUNT").unwrap_or(defaults.secrets_mount),
            consul_addr: lookup("CONSUL_HTTP_ADDR").unwrap_or(defaults.consul_addr),
            role: lookup("CONSUL_TOKEN_ROLE").unwrap_or_default(),
            strategy,
            vault_token: lookup("VAULT_TOKEN").map(Credential::from),
            nonce: lookup("VAULT_NONCE").map(Credential::from),
            nonce_path: lookup("VAULT_NONCE_PATH").map(PathBuf::from).unwrap_or(defaults.nonce_path),
            metadata_url: lookup("EC2_METADATA_URL").unwrap_or(defaults.metadata_url),
            http_timeout_seconds,
            logging: LoggingConfig {
                log_level: lookup("CONSUL_TOKEN_LOG_LEVEL").unwrap_or(defaults.logging.log_level),
                json_logging,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        Validate::validate(&self.logging)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.strategy == StrategyKind::Static
            && self.vault_token.as_ref().map_or(true, |token| token.is_empty())
        {
            return Err(TokenError::config_error("The static strategy requires VAULT_TOKEN"));
        }

        for (name, address) in [("Vault", &self.vault_addr), ("Consul", &self.consul_addr)] {
            if !address.starts_with("http://") && !address.starts_with("https://") {
                return Err(TokenError::config_error(format!(
                    "{} address must start with http:// or https://",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Broker client configuration
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            address: self.vault_addr.clone(),
            namespace: self.vault_namespace.clone(),
            auth_mount: self.auth_mount.clone(),
            secrets_mount: self.secrets_mount.clone(),
            timeout: self.http_timeout(),
        }
    }

    /// Registry validator configuration
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig { address: self.consul_addr.clone(), timeout: self.http_timeout() }
    }

    /// Build the configured identity strategy.
    ///
    /// For the ec2 strategy this resolves the nonce.
    pub fn build_strategy(&self) -> Result<Arc<dyn Strategy>> {
        match self.strategy {
            StrategyKind::Static => {
                let token = self.vault_token.clone().unwrap_or_default();
                Ok(Arc::new(StaticStrategy::new(token)))
            }
            StrategyKind::Ec2 => {
                let config = MetadataStrategyConfig {
                    metadata_url: self.metadata_url.clone(),
                    nonce: self.nonce.clone(),
                    nonce_path: self.nonce_path.clone(),
                    timeout: self.http_timeout(),
                };
                Ok(Arc::new(MetadataStrategy::new(config)?))
            }
        }
    }

    /// Wire registry, broker and strategy into a credential handle.
    pub fn build_token(&self) -> Result<Token> {
        let registry: Arc<dyn RegistryValidator> =
            Arc::new(ConsulRegistry::new(self.registry_config())?);
        let broker = Arc::new(VaultBroker::new(self.broker_config())?);
        let strategy = self.build_strategy()?;

        Ok(Token::new(Some(registry), broker, self.role.clone(), Some(strategy)))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_requires_vault_addr() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("VAULT_ADDR"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup_from(&[("VAULT_ADDR", "http://vault:8200")]))
            .unwrap();

        assert_eq!(config.vault_addr, "http://vault:8200");
        assert_eq!(config.consul_addr, "http://127.0.0.1:8500");
        assert_eq!(config.strategy, StrategyKind::Ec2);
        assert_eq!(config.auth_mount, "aws-ec2");
        assert_eq!(config.secrets_mount, "consul");
        assert_eq!(config.nonce_path, PathBuf::from("/etc/vault-nonce"));
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert!(config.role.is_empty());
    }

    #[test]
    fn test_from_lookup_static_strategy() {
        let config = Config::from_lookup(lookup_from(&[
            ("VAULT_ADDR", "http://vault:8200"),
            ("CONSUL_TOKEN_STRATEGY", "static"),
            ("VAULT_TOKEN", "s.bootstrap"),
            ("CONSUL_TOKEN_ROLE", "web"),
            ("CONSUL_TOKEN_LOG_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(config.strategy, StrategyKind::Static);
        assert_eq!(config.vault_token.as_ref().map(Credential::expose), Some("s.bootstrap"));
        assert_eq!(config.role, "web");
        assert!(config.logging.json_logging);
    }

    #[test]
    fn test_static_strategy_requires_token() {
        let result = Config::from_lookup(lookup_from(&[
            ("VAULT_ADDR", "http://vault:8200"),
            ("CONSUL_TOKEN_STRATEGY", "static"),
        ]));
        assert!(matches!(result, Err(TokenError::Config { .. })));
    }

    #[test]
    fn test_config_validation_errors() {
        let result = Config::from_lookup(lookup_from(&[
            ("VAULT_ADDR", "http://vault:8200"),
            ("CONSUL_TOKEN_HTTP_TIMEOUT_SECS", "0"),
        ]));
        assert!(result.unwrap_err().to_string().contains("HTTP timeout"));

        let result = Config::from_lookup(lookup_from(&[("VAULT_ADDR", "vault:8200")]));
        assert!(result.is_err());

        let result = Config::from_lookup(lookup_from(&[
            ("VAULT_ADDR", "http://vault:8200"),
            ("CONSUL_TOKEN_STRATEGY", "kerberos"),
        ]));
        assert!(result.unwrap_err().to_string().contains("kerberos"));
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("static".parse::<StrategyKind>().unwrap(), StrategyKind::Static);
        assert_eq!("EC2".parse::<StrategyKind>().unwrap(), StrategyKind::Ec2);
        assert_eq!(StrategyKind::Ec2.to_string(), "ec2");
        assert!("iam".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_debug_redacts_vault_token() {
        let config = Config {
            vault_token: Some(Credential::new("s.bootstrap")),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("s.bootstrap"));
    }

    #[test]
    fn test_build_token_uses_role() {
        let config = Config {
            role: "web".to_string(),
            strategy: StrategyKind::Static,
            vault_token: Some(Credential::new("s.bootstrap")),
            ..Default::default()
        };
        let token = config.build_token().unwrap();
        assert_eq!(token.role(), "web");
    }
}

//! Downstream registry validation.
//!
//! The registry is the only authority on whether a credential is still
//! accepted, so validity is always asked of it rather than inferred from a
//! local expiry.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{Result, TokenError};
use super::types::Credential;

/// Configuration for [`ConsulRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Consul HTTP address
    pub address: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { address: "http://127.0.0.1:8500".to_string(), timeout: Duration::from_secs(10) }
    }
}

/// Answers whether the registry currently accepts a credential.
#[async_trait]
pub trait RegistryValidator: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(true)` if the registry recognizes `credential`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Registry`] if the registry cannot be asked
    async fn recognizes(&self, credential: &Credential) -> Result<bool>;
}

/// Consul ACL validator.
///
/// Reads the token's own ACL record via `/v1/acl/token/self`. Consul answers
/// 403 for an unknown or revoked token.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    client: Client,
    address: String,
}

impl ConsulRegistry {
    /// Creates a Consul validator.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Config`] if the address is empty
    /// - [`TokenError::Http`] if the HTTP client cannot be built
    pub fn new(config: RegistryConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(TokenError::config_error("Consul address cannot be empty"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokenError::Http(format!("Failed to build Consul client: {}", e)))?;

        Ok(Self { client, address: config.address.trim_end_matches('/').to_string() })
    }

    /// Consul address this validator talks to.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl RegistryValidator for ConsulRegistry {
    async fn recognizes(&self, credential: &Credential) -> Result<bool> {
        let url = format!("{}/v1/acl/token/self", self.address);

        let response = self
            .client
            .get(&url)
            .header("X-Consul-Token", credential.expose())
            .send()
            .await
            .map_err(|e| TokenError::registry(format!("Consul unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(false),
            status => Err(TokenError::registry(format!("Consul returned {}", status))),
        }
    }
}

//! Credential broker client.
//!
//! Talks to Vault through `vaultrs`. A renewal is two calls: trade the
//! identity proof for a Vault session token, then read the role-scoped
//! Consul credential with that session. The session is never retained.
//!
//! # Vault layout
//!
//! - `POST /v1/auth/{auth_mount}/login` (aws-ec2 login with `pkcs7`, `nonce`, `role`)
//! - `GET /v1/{secrets_mount}/creds/{role}` returning `{"data": {"token": ...}}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};
use vaultrs::auth::aws;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv1;

use super::error::{Result, TokenError};
use super::strategy::IdentityProof;
use super::types::Credential;

/// Configuration for [`VaultBroker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    /// Mount path of the EC2 auth method
    #[serde(default = "default_auth_mount")]
    pub auth_mount: String,

    /// Mount path of the Consul secrets engine
    #[serde(default = "default_secrets_mount")]
    pub secrets_mount: String,

    /// Per-request timeout
    pub timeout: Duration,
}

fn default_auth_mount() -> String {
    "aws-ec2".to_string()
}

fn default_secrets_mount() -> String {
    "consul".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            namespace: None,
            auth_mount: default_auth_mount(),
            secrets_mount: default_secrets_mount(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Exchanges identity proofs for downstream registry credentials.
#[async_trait]
pub trait CredentialBroker: Send + Sync + std::fmt::Debug {
    /// Trade an identity proof for a broker session token scoped to `role`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::BrokerRejected`] if the proof or role is refused or
    ///   the broker is unreachable
    async fn exchange(&self, proof: &IdentityProof, role: &str) -> Result<Credential>;

    /// Read the registry credential for `role` using a broker session.
    ///
    /// # Errors
    ///
    /// - [`TokenError::BrokerRejected`] if the read fails
    /// - [`TokenError::CredentialUnavailable`] if the payload has no string `token`
    async fn fetch_downstream_credential(
        &self,
        session: &Credential,
        role: &str,
    ) -> Result<Credential>;
}

/// HashiCorp Vault broker.
///
/// A `VaultClient` is built per request sequence so that a session token
/// only ever lives in the client that uses it.
#[derive(Debug, Clone)]
pub struct VaultBroker {
    config: BrokerConfig,
}

impl VaultBroker {
    /// Creates a Vault broker client.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Config`] if the address is empty or not a URL
    /// - [`TokenError::Http`] if the Vault client cannot be built
    pub fn new(mut config: BrokerConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(TokenError::config_error("Vault address cannot be empty"));
        }

        config.address = config.address.trim_end_matches('/').to_string();
        url::Url::parse(&config.address).map_err(|e| {
            TokenError::config_error(format!("Invalid Vault address '{}': {}", config.address, e))
        })?;

        let broker = Self { config };
        broker.client(None)?;
        Ok(broker)
    }

    /// Vault address this broker talks to.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    fn client(&self, session: Option<&Credential>) -> Result<VaultClient> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder
            .address(&self.config.address)
            .timeout(Some(self.config.timeout))
            // Never pick up VAULT_TOKEN from the environment implicitly
            .token(session.map(Credential::expose).unwrap_or_default());

        if let Some(ref namespace) = self.config.namespace {
            settings_builder.set_namespace(namespace.clone());
        }

        let settings = settings_builder.build().map_err(|e| {
            TokenError::config_error(format!("Invalid Vault client configuration: {}", e))
        })?;

        VaultClient::new(settings)
            .map_err(|e| TokenError::Http(format!("Failed to create Vault client: {}", e)))
    }

    async fn login(&self, document: &str, nonce: &Credential, role: &str) -> Result<Credential> {
        let client = self.client(None)?;
        // An empty nonce asks Vault to issue one
        let nonce = Some(nonce.expose()).filter(|nonce| !nonce.is_empty());

        let auth = aws::ec2_login(&client, &self.config.auth_mount, document, nonce, Some(role))
            .await
            .map_err(|e| {
                let reason = describe(&e);
                error!(role = %role, error = %reason, "Vault rejected identity proof");
                TokenError::broker_rejected(format!(
                    "Vault login for role '{}' failed: {}",
                    role, reason
                ))
            })?;

        if auth.client_token.is_empty() {
            return Err(TokenError::broker_rejected("Vault login response carried no client token"));
        }
        Ok(Credential::new(auth.client_token))
    }
}

#[async_trait]
impl CredentialBroker for VaultBroker {
    async fn exchange(&self, proof: &IdentityProof, role: &str) -> Result<Credential> {
        match proof {
            IdentityProof::Static(token) => {
                if token.is_empty() {
                    return Err(TokenError::broker_rejected("Static Vault token is empty"));
                }
                debug!(role = %role, "Using static Vault token as broker session");
                Ok(token.clone())
            }
            IdentityProof::Metadata { document, nonce } => {
                let session = self.login(document, nonce, role).await?;
                debug!(role = %role, "Exchanged identity document for Vault session");
                Ok(session)
            }
        }
    }

    async fn fetch_downstream_credential(
        &self,
        session: &Credential,
        role: &str,
    ) -> Result<Credential> {
        let client = self.client(Some(session))?;

        // The creds endpoint has no typed wrapper; it reads like a KV v1 secret
        let response = kv1::get_raw(&client, &self.config.secrets_mount, &format!("creds/{}", role))
            .await
            .map_err(|e| {
                let reason = describe(&e);
                error!(role = %role, error = %reason, "Vault refused credential read");
                TokenError::broker_rejected(format!(
                    "Reading credentials for role '{}' failed: {}",
                    role, reason
                ))
            })?;

        // The secret payload is an opaque map; only `token` is ours to read
        match response.data.get("token") {
            Some(Value::String(token)) => Ok(Credential::new(token.as_str())),
            _ => Err(TokenError::CredentialUnavailable),
        }
    }
}

/// Renders a Vault client error with Vault's own `errors` list when present.
/// Never includes secret data.
fn describe(error: &ClientError) -> String {
    match error {
        ClientError::APIError { code, errors } if errors.is_empty() => {
            format!("Vault returned {}", code)
        }
        ClientError::APIError { code, errors } => {
            format!("Vault returned {}: {}", code, errors.join("; "))
        }
        ClientError::ResponseEmptyError => "empty response".to_string(),
        other => other.to_string(),
    }
}

//! Cloud-metadata identity strategy.
//!
//! Proves identity with the EC2 instance identity document (PKCS#7 signed by
//! AWS) fetched from the local metadata service, paired with a nonce that the
//! broker uses to reject replays of the same document from another client.
//!
//! The nonce is resolved exactly once when the strategy is built:
//! 1. an explicit nonce in [`MetadataStrategyConfig::nonce`], otherwise
//! 2. the trimmed contents of [`MetadataStrategyConfig::nonce_path`], otherwise
//! 3. the empty string (the broker then issues a nonce on first login).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::error::{Result, TokenError};
use super::strategy::{IdentityProof, Strategy};
use super::types::Credential;

/// Instance identity document endpoint of the EC2 metadata service.
pub const DEFAULT_METADATA_URL: &str =
    "http://169.254.169.254/latest/dynamic/instance-identity/pkcs7";

/// Well-known location of a previously issued broker nonce.
pub const DEFAULT_NONCE_PATH: &str = "/etc/vault-nonce";

/// Configuration for [`MetadataStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataStrategyConfig {
    /// Identity document endpoint
    pub metadata_url: String,

    /// Explicit nonce; takes priority over `nonce_path`
    pub nonce: Option<Credential>,

    /// File holding the nonce when none is given explicitly
    pub nonce_path: PathBuf,

    /// Per-request timeout for the metadata call
    pub timeout: Duration,
}

impl Default for MetadataStrategyConfig {
    fn default() -> Self {
        Self {
            metadata_url: DEFAULT_METADATA_URL.to_string(),
            nonce: None,
            nonce_path: PathBuf::from(DEFAULT_NONCE_PATH),
            timeout: Duration::from_secs(10),
        }
    }
}

impl MetadataStrategyConfig {
    /// Use an explicit nonce instead of reading the nonce file.
    pub fn with_nonce(mut self, nonce: impl Into<Credential>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Point the strategy at a different metadata endpoint.
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    /// Read the nonce from a different file.
    pub fn with_nonce_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.nonce_path = path.into();
        self
    }
}

/// Identity strategy backed by the EC2 instance identity document.
#[derive(Debug, Clone)]
pub struct MetadataStrategy {
    client: Client,
    metadata_url: String,
    nonce: Credential,
}

impl MetadataStrategy {
    /// Build the strategy and resolve its nonce.
    ///
    /// A missing or unreadable nonce file is not an error; the nonce is
    /// then empty for the lifetime of this instance.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Http`] if the HTTP client cannot be built
    pub fn new(config: MetadataStrategyConfig) -> Result<Self> {
        let nonce = match config.nonce {
            Some(nonce) if !nonce.is_empty() => nonce,
            _ => read_nonce(&config.nonce_path),
        };

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TokenError::Http(format!("Failed to build metadata client: {}", e)))?;

        Ok(Self { client, metadata_url: config.metadata_url, nonce })
    }

    /// The nonce bound to this strategy.
    pub fn nonce(&self) -> &Credential {
        &self.nonce
    }

    async fn fetch_identity_document(&self) -> Result<String> {
        let response = self.client.get(&self.metadata_url).send().await.map_err(|e| {
            TokenError::proof_unavailable(format!("Metadata endpoint unreachable: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::proof_unavailable(format!(
                "Metadata endpoint returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            TokenError::proof_unavailable(format!("Failed to read identity document: {}", e))
        })?;

        // The broker expects the PKCS#7 blob on a single line
        Ok(body.replace('\n', ""))
    }
}

#[async_trait]
impl Strategy for MetadataStrategy {
    async fn obtain(&self, role: &str) -> Result<IdentityProof> {
        let document = self.fetch_identity_document().await?;
        debug!(role = %role, document_len = document.len(), "Fetched instance identity document");

        Ok(IdentityProof::Metadata { document, nonce: self.nonce.clone() })
    }
}

fn read_nonce(path: &Path) -> Credential {
    match std::fs::read_to_string(path) {
        Ok(content) => Credential::new(content.trim()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No nonce file, starting with an empty nonce");
            Credential::default()
        }
    }
}

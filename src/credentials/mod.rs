//! Registry credential lifecycle.
//!
//! This module keeps a Consul ACL token usable for the life of a process
//! without the caller handling renewal. It is built from three pieces:
//!
//! - [`Strategy`]: proves this machine's identity for a role, either with a
//!   static Vault token ([`StaticStrategy`]) or with the EC2 instance
//!   identity document ([`MetadataStrategy`])
//! - [`CredentialBroker`]: trades the proof for a Vault session and reads
//!   the role's Consul credential ([`VaultBroker`])
//! - [`Token`]: holds the current credential, asks the registry
//!   ([`ConsulRegistry`]) whether it is still accepted, and renews on demand
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use consul_token::credentials::{
//!     BrokerConfig, ConsulRegistry, MetadataStrategy, MetadataStrategyConfig, RegistryConfig,
//!     RegistryValidator, Strategy, Token, VaultBroker,
//! };
//!
//! let registry: Arc<dyn RegistryValidator> =
//!     Arc::new(ConsulRegistry::new(RegistryConfig::default())?);
//! let broker = Arc::new(VaultBroker::new(BrokerConfig::default())?);
//! let strategy: Arc<dyn Strategy> =
//!     Arc::new(MetadataStrategy::new(MetadataStrategyConfig::default())?);
//!
//! let token = Token::new(Some(registry), broker, "web", Some(strategy));
//!
//! // Renews transparently when Consul no longer accepts the held token
//! let acl_token = token.get().await;
//! ```
//!
//! # Security
//!
//! - Credentials and Vault sessions are wrapped in [`Credential`] and never logged
//! - Broker payloads are not echoed into errors; a malformed payload is
//!   reported as [`TokenError::CredentialUnavailable`]

pub mod broker;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod strategy;
pub mod token;
pub mod types;

pub use broker::{BrokerConfig, CredentialBroker, VaultBroker};
pub use error::{Result, TokenError};
pub use metadata::{MetadataStrategy, MetadataStrategyConfig};
pub use registry::{ConsulRegistry, RegistryConfig, RegistryValidator};
pub use strategy::{IdentityProof, StaticStrategy, Strategy};
pub use token::Token;
pub use types::Credential;

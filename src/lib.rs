//! # consul-token
//!
//! Keeps a Consul ACL token usable for the life of a process. The token is
//! brokered by Vault: the process proves its identity (a static Vault token
//! or the EC2 instance identity document), Vault hands back a role-scoped
//! Consul token, and the handle renews it whenever Consul stops accepting it.
//!
//! ```text
//! Token::get ──▶ Consul /v1/acl/token/self ──rejected──▶ Strategy::obtain
//!                                                          │
//!                      Vault /v1/consul/creds/{role} ◀── Vault login
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use consul_token::{Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let token = config.build_token()?;
//!     let acl_token = token.get().await;
//!     println!("{}", acl_token);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod credentials;
pub mod observability;

// Re-export commonly used types and traits
pub use config::{Config, StrategyKind};
pub use credentials::{Credential, Result, Token, TokenError};
pub use observability::init_logging;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

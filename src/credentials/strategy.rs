//! Identity proof strategies.
//!
//! A [`Strategy`] produces whatever the broker needs to believe that this
//! process may act as a role. The token handle asks for a fresh proof on
//! every renewal; proofs are never cached.

use async_trait::async_trait;

use super::error::Result;
use super::types::Credential;

/// Broker-acceptable assertion of identity for one renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityProof {
    /// A pre-issued broker token, used as the broker session as-is.
    Static(Credential),

    /// A signed machine identity document paired with the strategy's nonce.
    Metadata {
        /// Single-line identity document (PKCS#7, newlines stripped).
        document: String,
        /// Nonce bound to the strategy instance; may be empty.
        nonce: Credential,
    },
}

/// Produces identity proofs for a role.
///
/// Implementations hold no mutable state beyond what they fix at
/// construction and must be `Send + Sync` so a handle can be shared.
#[async_trait]
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Produce a proof for `role`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::ProofUnavailable`](super::TokenError::ProofUnavailable)
    ///   if the proof material cannot be gathered
    async fn obtain(&self, role: &str) -> Result<IdentityProof>;
}

/// Strategy backed by a fixed broker token.
///
/// Useful for bootstrapping and tests. The token never expires from the
/// strategy's point of view and never regenerates.
#[derive(Debug, Clone)]
pub struct StaticStrategy {
    token: Credential,
}

impl StaticStrategy {
    /// Create a static strategy around a broker token.
    pub fn new(token: impl Into<Credential>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl Strategy for StaticStrategy {
    async fn obtain(&self, _role: &str) -> Result<IdentityProof> {
        Ok(IdentityProof::Static(self.token.clone()))
    }
}

//! Self-renewing registry credential handle.
//!
//! A [`Token`] owns one role-scoped registry credential. It never trusts a
//! local notion of expiry: every validity check asks the registry, and an
//! invalid credential is replaced by proving identity to the broker again.
//!
//! ```text
//!  Empty ──renew ok──▶ Valid ──registry rejects──▶ Stale
//!                        ▲                           │
//!                        └────────renew ok───────────┘
//! ```
//!
//! A failed renewal leaves the held value untouched.
//!
//! # Concurrency
//!
//! The value sits behind an async mutex that renewal holds for the whole
//! exchange, so two callers of one handle never log in twice for the same
//! stale credential. Separate handles (or processes) for the same role may
//! still log in concurrently; the broker has to tolerate that.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::broker::CredentialBroker;
use super::error::{Result, TokenError};
use super::registry::RegistryValidator;
use super::strategy::Strategy;
use super::types::Credential;

/// Handle to one role-scoped registry credential.
pub struct Token {
    registry: Option<Arc<dyn RegistryValidator>>,
    broker: Arc<dyn CredentialBroker>,
    role: String,
    strategy: Option<Arc<dyn Strategy>>,
    value: Mutex<Credential>,
}

impl Token {
    /// Create a handle with no credential yet.
    ///
    /// Without a `registry` the handle can never certify a credential and
    /// [`Token::get`] always returns `""`. An empty `role` means the handle
    /// never needs renewal.
    pub fn new(
        registry: Option<Arc<dyn RegistryValidator>>,
        broker: Arc<dyn CredentialBroker>,
        role: impl Into<String>,
        strategy: Option<Arc<dyn Strategy>>,
    ) -> Self {
        Self {
            registry,
            broker,
            role: role.into(),
            strategy,
            value: Mutex::new(Credential::default()),
        }
    }

    /// Role this handle is scoped to.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Currently held credential, without asking the registry.
    pub async fn cached(&self) -> Credential {
        self.value.lock().await.clone()
    }

    /// Ask the registry whether the held credential is accepted.
    ///
    /// An empty credential is invalid without a registry call. Registry
    /// errors count as "not accepted".
    pub async fn is_valid(&self) -> bool {
        let value = self.value.lock().await.clone();
        self.probe(&value).await
    }

    /// Replace the held credential with a freshly brokered one.
    ///
    /// Succeeds without doing anything when the role is empty.
    ///
    /// # Errors
    ///
    /// - [`TokenError::MissingStrategy`] if no strategy is bound
    /// - any error from proof generation or the broker exchange; the held
    ///   value is left unchanged
    pub async fn renew(&self) -> Result<()> {
        if self.role.is_empty() {
            return Ok(());
        }

        let mut value = self.value.lock().await;
        self.renew_locked(&mut value).await
    }

    /// The credential to use right now.
    ///
    /// Renews at most once if the registry rejects the held value. Never
    /// fails: a failed renewal is logged and whatever is held is returned,
    /// possibly `""`. Call [`Token::renew`] directly to see renewal errors.
    pub async fn get(&self) -> String {
        if self.registry.is_none() {
            return String::new();
        }

        let mut value = self.value.lock().await;
        if !self.probe(&value).await && !self.role.is_empty() {
            if let Err(e) = self.renew_locked(&mut value).await {
                warn!(role = %self.role, error = %e, "Registry credential renewal failed");
            }
        }

        value.expose().to_string()
    }

    async fn probe(&self, value: &Credential) -> bool {
        if value.is_empty() {
            return false;
        }

        let Some(registry) = &self.registry else {
            return false;
        };

        match registry.recognizes(value).await {
            Ok(recognized) => recognized,
            Err(e) => {
                debug!(role = %self.role, error = %e, "Registry probe failed, treating credential as invalid");
                false
            }
        }
    }

    /// Renew into `value`, which the caller holds locked.
    #[instrument(skip_all, fields(role = %self.role))]
    async fn renew_locked(&self, value: &mut Credential) -> Result<()> {
        *value = self.fetch_credential().await?;
        info!("Renewed registry credential");
        Ok(())
    }

    async fn fetch_credential(&self) -> Result<Credential> {
        let strategy =
            self.strategy.as_ref().ok_or_else(|| TokenError::missing_strategy(&self.role))?;

        let proof = strategy.obtain(&self.role).await?;
        let session = self.broker.exchange(&proof, &self.role).await?;
        self.broker.fetch_downstream_credential(&session, &self.role).await
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("role", &self.role)
            .field("registry", &self.registry)
            .field("strategy", &self.strategy)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

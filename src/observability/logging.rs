//! # Structured Logging
//!
//! Field conventions: `role` for the credential role, `vault_addr` and
//! `consul_addr` for endpoints. Credential values are never passed to a
//! logging macro; use [`Credential`](crate::credentials::Credential) which
//! renders as `[REDACTED]`.

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::Config) {
    tracing::info!(
        vault_addr = %config.vault_addr,
        vault_namespace = ?config.vault_namespace,
        consul_addr = %config.consul_addr,
        role = %config.role,
        strategy = %config.strategy,
        auth_mount = %config.auth_mount,
        secrets_mount = %config.secrets_mount,
        static_token_set = config.vault_token.is_some(),
        "Credential broker configuration"
    );
}

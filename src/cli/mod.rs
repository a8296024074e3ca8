//! # Command Line Interface
//!
//! `consul-token` prints a Consul ACL token brokered by Vault, renewing it
//! when Consul no longer accepts it. Configuration comes from the
//! environment (see [`crate::config`]); flags override it.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{Config, StrategyKind};
use crate::observability::{init_logging, log_config_info};

#[derive(Parser)]
#[command(name = "consul-token")]
#[command(about = "Obtain and renew Consul ACL tokens through Vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Role to request credentials for
    #[arg(long, global = true, env = "CONSUL_TOKEN_ROLE")]
    pub role: Option<String>,

    /// Identity strategy (static or ec2)
    #[arg(long, global = true, env = "CONSUL_TOKEN_STRATEGY")]
    pub strategy: Option<StrategyKind>,

    /// Vault address
    #[arg(long, global = true, env = "VAULT_ADDR")]
    pub vault_addr: Option<String>,

    /// Consul address
    #[arg(long, global = true, env = "CONSUL_HTTP_ADDR")]
    pub consul_addr: Option<String>,

    /// Nonce for the ec2 strategy
    #[arg(long, global = true, env = "VAULT_NONCE", hide_env_values = true)]
    pub nonce: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a usable token, renewing it if needed
    Get,

    /// Force a renewal and print the new token
    Renew,

    /// Renew and confirm Consul accepts the result
    Check,
}

impl Cli {
    /// Value of a configuration key, with flags taking priority over `env`.
    fn lookup<F>(&self, key: &str, env: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = match key {
            "CONSUL_TOKEN_ROLE" => self.role.clone(),
            "CONSUL_TOKEN_STRATEGY" => self.strategy.map(|s| s.as_str().to_string()),
            "VAULT_ADDR" => self.vault_addr.clone(),
            "CONSUL_HTTP_ADDR" => self.consul_addr.clone(),
            "VAULT_NONCE" => self.nonce.clone(),
            "CONSUL_TOKEN_LOG_LEVEL" if self.verbose => Some("debug".to_string()),
            _ => None,
        };
        flag.or_else(|| env(key))
    }

    /// Build configuration from flags layered over `env`.
    pub fn load_config<F>(&self, env: F) -> crate::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        Config::from_lookup(|key| self.lookup(key, &env))
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = cli
        .load_config(|key| std::env::var(key).ok())
        .context("Failed to load configuration")?;

    init_logging(&config.logging)?;
    log_config_info(&config);

    let token = config.build_token().context("Failed to build credential handle")?;

    let code = match cli.command {
        Commands::Get => {
            let value = token.get().await;
            if value.is_empty() {
                eprintln!("No usable token for role '{}'", token.role());
                ExitCode::FAILURE
            } else {
                println!("{}", value);
                ExitCode::SUCCESS
            }
        }

        Commands::Renew => {
            token
                .renew()
                .await
                .with_context(|| format!("Failed to renew token for role '{}'", token.role()))?;
            println!("{}", token.cached().await.expose());
            ExitCode::SUCCESS
        }

        Commands::Check => {
            token
                .renew()
                .await
                .with_context(|| format!("Failed to renew token for role '{}'", token.role()))?;
            if token.is_valid().await {
                println!("valid");
                ExitCode::SUCCESS
            } else {
                println!("invalid");
                ExitCode::FAILURE
            }
        }
    };

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    // Parses flags only; clap would otherwise read the process environment
    fn parse(args: &[&str]) -> Cli {
        let mut cli = Cli::try_parse_from(args).unwrap();
        for (flag, field) in [
            ("--role", &mut cli.role),
            ("--vault-addr", &mut cli.vault_addr),
            ("--consul-addr", &mut cli.consul_addr),
            ("--nonce", &mut cli.nonce),
        ] {
            if !args.contains(&flag) {
                *field = None;
            }
        }
        if !args.contains(&"--strategy") {
            cli.strategy = None;
        }
        cli
    }

    #[test]
    fn test_parse_get_with_overrides() {
        let cli = parse(&[
            "consul-token",
            "get",
            "--role",
            "web",
            "--strategy",
            "static",
            "--consul-addr",
            "http://consul:8500",
        ]);

        assert!(matches!(cli.command, Commands::Get));
        assert_eq!(cli.role.as_deref(), Some("web"));
        assert_eq!(cli.strategy, Some(StrategyKind::Static));

        let config = cli
            .load_config(env_from(&[
                ("VAULT_ADDR", "http://vault:8200"),
                ("VAULT_TOKEN", "s.bootstrap"),
            ]))
            .unwrap();
        assert_eq!(config.role, "web");
        assert_eq!(config.consul_addr, "http://consul:8500");
        assert_eq!(config.strategy, StrategyKind::Static);
    }

    #[test]
    fn test_vault_addr_flag_keeps_environment() {
        let cli = parse(&["consul-token", "--vault-addr", "http://127.0.0.1:1", "renew"]);

        let config = cli
            .load_config(env_from(&[
                ("CONSUL_TOKEN_ROLE", "web"),
                ("CONSUL_TOKEN_STRATEGY", "static"),
                ("VAULT_TOKEN", "s.x"),
            ]))
            .unwrap();

        assert_eq!(config.vault_addr, "http://127.0.0.1:1");
        assert_eq!(config.role, "web");
        assert_eq!(config.strategy, StrategyKind::Static);
        assert!(config.vault_token.is_some());
    }

    #[test]
    fn test_flag_overrides_environment_value() {
        let cli = parse(&["consul-token", "--vault-addr", "http://flag:8200", "get"]);

        let config =
            cli.load_config(env_from(&[("VAULT_ADDR", "http://env:8200")])).unwrap();
        assert_eq!(config.vault_addr, "http://flag:8200");
    }

    #[test]
    fn test_other_config_errors_are_not_masked() {
        let cli = parse(&["consul-token", "--vault-addr", "http://127.0.0.1:1", "renew"]);

        let result = cli.load_config(env_from(&[("CONSUL_TOKEN_HTTP_TIMEOUT_SECS", "soon")]));
        assert!(result.unwrap_err().to_string().contains("HTTP timeout"));

        let result = cli.load_config(env_from(&[("CONSUL_TOKEN_STRATEGY", "static")]));
        assert!(result.unwrap_err().to_string().contains("VAULT_TOKEN"));
    }

    #[test]
    fn test_missing_vault_addr_is_an_error() {
        let cli = parse(&["consul-token", "get"]);
        let result = cli.load_config(env_from(&[("CONSUL_TOKEN_ROLE", "web")]));
        assert!(result.unwrap_err().to_string().contains("VAULT_ADDR"));
    }

    #[test]
    fn test_parse_rejects_unknown_strategy() {
        let result = Cli::try_parse_from(["consul-token", "renew", "--strategy", "kerberos"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_raises_log_level() {
        let cli = parse(&["consul-token", "-v", "check"]);
        let config =
            cli.load_config(env_from(&[("VAULT_ADDR", "http://vault:8200")])).unwrap();
        assert_eq!(config.logging.log_level, "debug");
    }
}

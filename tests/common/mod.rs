//! Shared helpers for integration tests.
//!
//! Vault, Consul and the EC2 metadata service are stood in for by wiremock
//! servers. Consul only accepts tokens that a test registered with
//! [`consul_accepts`]; everything else gets a 403.

#![allow(dead_code)]

use std::sync::Arc;

use consul_token::credentials::{
    BrokerConfig, ConsulRegistry, RegistryConfig, RegistryValidator, StaticStrategy, Strategy,
    Token, VaultBroker,
};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOOTSTRAP_TOKEN: &str = "s.bootstrap";

/// Consul answers 403 to any token not explicitly accepted.
pub async fn start_consul() -> MockServer {
    let consul = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/acl/token/self"))
        .respond_with(ResponseTemplate::new(403).set_body_string("ACL not found"))
        .with_priority(10)
        .mount(&consul)
        .await;
    consul
}

/// Make Consul accept `token`.
pub async fn consul_accepts(consul: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/acl/token/self"))
        .and(header("X-Consul-Token", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "AccessorID": "6a1253d2-1785-24fd-91c2-f8e78c745511",
            "SecretID": token,
            "Policies": [{ "Name": "foo" }],
        })))
        .with_priority(1)
        .mount(consul)
        .await;
}

/// A Vault secret response wrapping `data`.
pub fn vault_secret(data: Value) -> Value {
    json!({
        "request_id": "5e3f0c1a-2b4d-4e6f-8a9b-0c1d2e3f4a5b",
        "lease_id": "consul/creds/role/abc123",
        "renewable": true,
        "lease_duration": 3600,
        "data": data,
        "auth": null,
        "warnings": null,
        "wrap_info": null,
    })
}

/// A Vault login response issuing `client_token`.
pub fn vault_auth(client_token: &str) -> Value {
    json!({
        "request_id": "9a8b7c6d-5e4f-4a3b-2c1d-0e9f8a7b6c5d",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "warnings": null,
        "wrap_info": null,
        "auth": {
            "client_token": client_token,
            "accessor": "8609694a-cdbc-db9b-d345-e782dbb562ed",
            "policies": ["default", "consul-creds"],
            "token_policies": ["default", "consul-creds"],
            "metadata": { "role": "foo", "region": "us-east-1" },
            "lease_duration": 1800,
            "renewable": true,
            "entity_id": "",
            "token_type": "service",
            "orphan": true,
        },
    })
}

/// Vault issues `credential` for `role` to sessions holding `session`.
pub async fn vault_issues(vault: &MockServer, role: &str, session: &str, credential: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/consul/creds/{}", role)))
        .and(header("X-Vault-Token", session))
        .respond_with(ResponseTemplate::new(200).set_body_json(vault_secret(json!({
            "token": credential,
            "accessor": "0a8c5b1e",
        }))))
        .with_priority(1)
        .mount(vault)
        .await;
}

/// Any credential read Vault has no explicit answer for is an unknown role.
pub async fn vault_rejects_unknown(vault: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "errors": ["Role not found"] })),
        )
        .with_priority(10)
        .mount(vault)
        .await;
}

pub fn static_strategy(token: &str) -> Arc<dyn Strategy> {
    Arc::new(StaticStrategy::new(token))
}

pub fn broker(vault: &MockServer) -> Arc<VaultBroker> {
    Arc::new(
        VaultBroker::new(BrokerConfig { address: vault.uri(), ..Default::default() }).unwrap(),
    )
}

pub fn registry(consul: &MockServer) -> Arc<dyn RegistryValidator> {
    Arc::new(
        ConsulRegistry::new(RegistryConfig { address: consul.uri(), ..Default::default() })
            .unwrap(),
    )
}

/// A token wired to the mock Vault and Consul.
pub fn token_for(
    vault: &MockServer,
    consul: &MockServer,
    role: &str,
    strategy: Option<Arc<dyn Strategy>>,
) -> Token {
    Token::new(Some(registry(consul)), broker(vault), role, strategy)
}

//! Test helpers for gateway-auth integration tests.
//!
//! Every test gets its own in-memory stores, so tests run in parallel without shared state.

#![allow(dead_code)]

use std::sync::Once;

use gateway_auth::{
    dtos::AccessAndRefreshTokens, models::Principal, AuthConfig, AuthService,
};

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| gateway_core::observability::init_tracing("gateway-auth-test", "debug"));
}

pub fn test_config() -> AuthConfig {
    AuthConfig::default()
}

pub fn setup() -> AuthService {
    init_test_tracing();
    AuthService::in_memory(&test_config())
}

pub fn setup_with(config: AuthConfig) -> AuthService {
    init_test_tracing();
    AuthService::in_memory(&config)
}

/// Log `id` in through the `toy` provider and resolve the resulting principal.
pub async fn login(service: &AuthService, id: &str) -> (AccessAndRefreshTokens, Principal) {
    let tokens = service.login("toy", id).await.expect("login failed");
    let principal = service
        .authenticate_access_token(&tokens.access_token)
        .await
        .expect("access token rejected");
    (tokens, principal)
}

pub fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

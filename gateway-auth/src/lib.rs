//! gateway-auth: identity, session and API-key core of the catalog gateway.
//!
//! Validates and materializes [`models::Principal`]s from stored records, computes their
//! effective scopes, and issues/rotates the tokens that carry them. Everything leaving this crate
//! is meant to be wrapped in a [`gateway_core::protocol::Envelope`] by the HTTP layer.

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;

pub use config::AuthConfig;
pub use services::{AuthService, ServiceError};

//! Services layer for gateway-auth.
//!
//! Login, refresh-token rotation, API-key authentication and the discovery document, on top of
//! the store traits in [`store`].

mod auth;
mod discovery;
pub mod error;
pub(crate) mod jwt;
pub mod store;

pub use auth::AuthService;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims};
pub use store::{ApiKeyStore, InMemoryStore, PrincipalStore, SessionStore};

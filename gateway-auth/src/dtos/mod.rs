pub mod about;
pub mod auth;

pub use about::{
    About, AboutAuthentication, AboutAuthenticationLinks, AboutAuthenticationProvider,
    AuthenticationMode,
};
pub use auth::{
    AccessAndRefreshTokens, ApiKeyRequestParams, RefreshTokenRequest, MAX_API_KEY_LIFETIME_SECONDS,
};

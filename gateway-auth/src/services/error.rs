use gateway_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session revoked")]
    SessionRevoked,

    #[error("Session expired")]
    SessionExpired,

    #[error("Refresh token already used")]
    RefreshTokenReused,

    #[error("API key not found")]
    KeyNotFound,

    #[error("API key secret mismatch")]
    KeySecretMismatch,

    #[error("API key expired")]
    KeyExpired,

    #[error("Requested scopes exceed the principal's scopes: {}", .0.join(", "))]
    ScopeViolation(Vec<String>),

    #[error("Provider '{0}' is already bound to a different identity")]
    IdentityConflict(String),

    #[error("Principal not found")]
    PrincipalNotFound,
}

impl ServiceError {
    /// Failures a client sees as "not authenticated".
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidToken
                | ServiceError::SessionNotFound
                | ServiceError::SessionRevoked
                | ServiceError::SessionExpired
                | ServiceError::RefreshTokenReused
                | ServiceError::KeyNotFound
                | ServiceError::KeySecretMismatch
                | ServiceError::KeyExpired
        )
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Validation(e) => AppError::ValidationError(e),
            ServiceError::InvalidToken => AppError::InvalidToken("Invalid token".to_string()),
            ServiceError::ScopeViolation(scopes) => AppError::Forbidden(anyhow::anyhow!(
                "Requested scopes exceed the principal's scopes: {}",
                scopes.join(", ")
            )),
            ServiceError::IdentityConflict(provider) => AppError::Conflict(anyhow::anyhow!(
                "Provider '{}' is already bound to a different identity",
                provider
            )),
            ServiceError::PrincipalNotFound => {
                AppError::NotFound(anyhow::anyhow!("Principal not found"))
            }
            other => AppError::AuthError(anyhow::anyhow!(other.to_string())),
        }
    }
}

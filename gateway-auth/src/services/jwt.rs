use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

const ACCESS_TOKEN_TYPE: &str = "access";
const REFRESH_TOKEN_TYPE: &str = "refresh";

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_seconds: i64,
    refresh_token_expiry_seconds: i64,
}

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (principal uuid)
    pub sub: String,
    /// Session the token was issued for
    pub sid: String,
    /// Scopes at issue time
    pub scp: Vec<String>,
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (principal uuid)
    pub sub: String,
    /// Session the token was issued for
    pub sid: String,
    /// Token ID (matches the session's current refresh token)
    pub jti: String,
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
}

impl JwtService {
    /// Create a JWT service signing with the shared HS256 secret
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!("JWT service initialized with HS256 key");

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_seconds: config.access_token_expiry_seconds,
            refresh_token_expiry_seconds: config.refresh_token_expiry_seconds,
        }
    }

    /// Generate an access token for a principal's session
    pub fn generate_access_token(
        &self,
        principal_uuid: &Uuid,
        session_uuid: &Uuid,
        scopes: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<String, anyhow::Error> {
        let exp = expires_after(now, self.access_token_expiry_seconds)
            .ok_or_else(|| anyhow::anyhow!("Access token expiry is out of range"))?;

        let claims = AccessTokenClaims {
            sub: principal_uuid.to_string(),
            sid: session_uuid.to_string(),
            scp: scopes,
            typ: ACCESS_TOKEN_TYPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Generate a refresh token; `token_id` must be recorded on the session
    pub fn generate_refresh_token(
        &self,
        principal_uuid: &Uuid,
        session_uuid: &Uuid,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, anyhow::Error> {
        let exp = expires_after(now, self.refresh_token_expiry_seconds)
            .ok_or_else(|| anyhow::anyhow!("Refresh token expiry is out of range"))?;

        let claims = RefreshTokenClaims {
            sub: principal_uuid.to_string(),
            sid: session_uuid.to_string(),
            jti: token_id.to_string(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))
    }

    /// `exp` is checked by the callers against their own clock, not the wall clock.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation
    }

    /// Validate and decode an access token as of `now`
    pub fn validate_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenClaims, anyhow::Error> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        if token_data.claims.typ != ACCESS_TOKEN_TYPE {
            return Err(anyhow::anyhow!("Invalid access token: wrong token type"));
        }
        if token_data.claims.exp <= now.timestamp() {
            return Err(anyhow::anyhow!("Invalid access token: expired"));
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token as of `now`
    pub fn validate_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenClaims, anyhow::Error> {
        let token_data =
            decode::<RefreshTokenClaims>(token, &self.decoding_key, &Self::validation())
                .map_err(|e| anyhow::anyhow!("Invalid refresh token: {}", e))?;

        if token_data.claims.typ != REFRESH_TOKEN_TYPE {
            return Err(anyhow::anyhow!("Invalid refresh token: wrong token type"));
        }
        if token_data.claims.exp <= now.timestamp() {
            return Err(anyhow::anyhow!("Invalid refresh token: expired"));
        }

        Ok(token_data.claims)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_seconds
    }

    pub fn refresh_token_expiry_seconds(&self) -> i64 {
        self.refresh_token_expiry_seconds
    }
}

/// `now + seconds`, or `None` when the result is not representable.
pub(crate) fn expires_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|ttl| now.checked_add_signed(ttl))
}

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::INHERIT_SCOPE;

/// Token pair returned by a login or a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAndRefreshTokens {
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub refresh_token: String,
    /// Seconds until the refresh token expires.
    pub refresh_token_expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Longest lifetime an API key may be created with: 100 years.
pub const MAX_API_KEY_LIFETIME_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

fn default_scopes() -> Option<Vec<String>> {
    Some(vec![INHERIT_SCOPE.to_string()])
}

/// The key must be present, but may be `null`.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer)
}

/// Request to create an API key for the authenticated principal.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApiKeyRequestParams {
    /// Lifetime in seconds; `null` creates a key that never expires.
    #[serde(deserialize_with = "required_nullable")]
    #[validate(range(
        min = 0,
        max = MAX_API_KEY_LIFETIME_SECONDS,
        message = "expires_in must be between 0 and 100 years"
    ))]
    pub expires_in: Option<i64>,

    #[serde(default = "default_scopes")]
    pub scopes: Option<Vec<String>>,

    #[serde(default)]
    #[validate(length(max = 255, message = "note must be at most 255 characters"))]
    pub note: Option<String>,
}

impl Default for ApiKeyRequestParams {
    fn default() -> Self {
        Self {
            expires_in: None,
            scopes: default_scopes(),
            note: None,
        }
    }
}

impl ApiKeyRequestParams {
    /// Requested scopes, with an explicit `null` treated like the default.
    pub fn requested_scopes(&self) -> Vec<String> {
        self.scopes.clone().unwrap_or_else(|| vec![INHERIT_SCOPE.to_string()])
    }
}

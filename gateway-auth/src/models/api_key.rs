//! API key model. Secrets are shown to the caller once and stored only as a SHA-256 digest.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use gateway_core::utils::secret::{hash_secret, verify_secret};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::services::ServiceError;

/// Scope token meaning "whatever the owner may do at the time the key is used".
pub const INHERIT_SCOPE: &str = "inherit";

const SECRET_BYTES: usize = 32;

/// Generate a fresh API key secret: 32 random bytes, hex-encoded.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// API key as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredApiKey {
    pub principal_uuid: Uuid,
    pub first_eight: String,
    pub secret_hash: String,
    pub expiration_time: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub scopes: Vec<String>,
    pub latest_activity: Option<DateTime<Utc>>,
}

impl StoredApiKey {
    /// Create the stored record for a freshly generated `secret`. The lookup prefix is taken
    /// from the secret itself.
    pub fn new(
        principal_uuid: Uuid,
        secret: &str,
        expiration_time: Option<DateTime<Utc>>,
        note: Option<String>,
        scopes: Vec<String>,
    ) -> Result<Self, ServiceError> {
        let first_eight = secret
            .get(..8)
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("API key secret too short")))?
            .to_string();

        Ok(Self {
            principal_uuid,
            first_eight,
            secret_hash: hash_secret(secret.as_bytes()),
            expiration_time,
            note,
            scopes,
            latest_activity: None,
        })
    }

    /// Expired once `now` reaches the expiration time; keys without one never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|t| t <= now)
    }

    /// Check a presented secret against this record.
    pub fn verify(&self, secret: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !verify_secret(secret.as_bytes(), &self.secret_hash) {
            return Err(ServiceError::KeySecretMismatch);
        }
        if self.is_expired(now) {
            return Err(ServiceError::KeyExpired);
        }
        Ok(())
    }

    pub fn inherits(&self) -> bool {
        self.scopes.iter().any(|s| s == INHERIT_SCOPE)
    }

    /// Scopes this key grants given the owner's current scopes. Never more than the owner has.
    pub fn resolve_scopes(&self, principal_scopes: &BTreeSet<String>) -> BTreeSet<String> {
        if self.inherits() {
            return principal_scopes.clone();
        }
        self.scopes
            .iter()
            .filter(|scope| principal_scopes.contains(*scope))
            .cloned()
            .collect()
    }
}

/// API key view. Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ApiKey {
    #[validate(length(equal = 8))]
    pub first_eight: String,
    pub expiration_time: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub note: Option<String>,
    pub scopes: Vec<String>,
    pub latest_activity: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn from_stored_record(record: &StoredApiKey) -> Self {
        Self {
            first_eight: record.first_eight.clone(),
            expiration_time: record.expiration_time,
            note: record.note.clone(),
            scopes: record.scopes.clone(),
            latest_activity: record.latest_activity,
        }
    }
}

/// The creation-time response: the key plus its secret in plaintext.
///
/// Deliberately neither `Clone` nor `Deserialize`; it is built once by the creation call.
#[derive(Serialize)]
pub struct ApiKeyWithSecret {
    #[serde(flatten)]
    pub api_key: ApiKey,
    /// Hex-encoded secret.
    pub secret: String,
}

impl ApiKeyWithSecret {
    pub(crate) fn from_stored_record(record: &StoredApiKey, secret: String) -> Self {
        Self {
            api_key: ApiKey::from_stored_record(record),
            secret,
        }
    }
}

impl fmt::Debug for ApiKeyWithSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyWithSecret")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

//! Session model - anchor of a chain of refresh tokens issued from one login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::ServiceError;

/// Session as persisted. `refresh_jti` names the only refresh token currently valid for the
/// session; it never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub uuid: Uuid,
    pub principal_uuid: Uuid,
    pub expiration_time: DateTime<Utc>,
    pub revoked: bool,
    pub refresh_jti: String,
}

impl StoredSession {
    /// Create a new session.
    pub fn new(principal_uuid: Uuid, expiration_time: DateTime<Utc>, refresh_jti: String) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            principal_uuid,
            expiration_time,
            revoked: false,
            refresh_jti,
        }
    }

    /// Expired once `now` reaches the expiration time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time <= now
    }

    /// Check that the session may still be refreshed at `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.revoked {
            return Err(ServiceError::SessionRevoked);
        }
        if self.is_expired(now) {
            return Err(ServiceError::SessionExpired);
        }
        Ok(())
    }

    /// Revocation is permanent.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Replace the current refresh token with `new_jti`. Presenting a token other than the
    /// current one means a superseded token was replayed: the session is revoked.
    pub fn rotate(
        &mut self,
        presented_jti: &str,
        new_jti: String,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.validate(now)?;

        if self.refresh_jti != presented_jti {
            self.revoke();
            return Err(ServiceError::RefreshTokenReused);
        }

        self.refresh_jti = new_jti;
        Ok(())
    }
}

/// Session view exposed on a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uuid: Uuid,
    pub expiration_time: DateTime<Utc>,
    pub revoked: bool,
}

impl Session {
    pub fn from_stored_record(record: &StoredSession) -> Self {
        Self {
            uuid: record.uuid,
            expiration_time: record.expiration_time,
            revoked: record.revoked,
        }
    }
}

//! Persistence seams for principals, sessions and API keys.
//!
//! The traits are what the auth flows depend on; [`InMemoryStore`] backs all three with
//! `DashMap`s and serves tests and single-process deployments.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{Identity, PrincipalType, StoredApiKey, StoredPrincipal, StoredSession};

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_principal(&self, uuid: &Uuid) -> Result<Option<StoredPrincipal>, ServiceError>;

    async fn find_principal_by_identity(
        &self,
        provider: &str,
        id: &str,
    ) -> Result<Option<StoredPrincipal>, ServiceError>;

    /// Return the principal bound to `identity`, creating it if no principal is bound yet.
    async fn find_or_create_by_identity(
        &self,
        principal_type: PrincipalType,
        roles: Vec<String>,
        identity: Identity,
    ) -> Result<StoredPrincipal, ServiceError>;

    /// Replace the stored record. Fails with `IdentityConflict` when one of its identities is
    /// already bound to another principal.
    async fn save_principal(&self, principal: &StoredPrincipal) -> Result<(), ServiceError>;

    async fn touch_principal(&self, uuid: &Uuid, now: DateTime<Utc>) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: StoredSession) -> Result<(), ServiceError>;

    async fn get_session(&self, uuid: &Uuid) -> Result<Option<StoredSession>, ServiceError>;

    async fn sessions_for(&self, principal_uuid: &Uuid) -> Result<Vec<StoredSession>, ServiceError>;

    /// Check the session and swap its refresh token id in one step. At most one caller
    /// presenting the current id succeeds.
    async fn rotate_refresh(
        &self,
        uuid: &Uuid,
        presented_jti: &str,
        new_jti: String,
        now: DateTime<Utc>,
    ) -> Result<StoredSession, ServiceError>;

    async fn revoke_session(&self, uuid: &Uuid) -> Result<StoredSession, ServiceError>;
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn insert_api_key(&self, key: StoredApiKey) -> Result<(), ServiceError>;

    async fn find_api_keys_by_first_eight(
        &self,
        first_eight: &str,
    ) -> Result<Vec<StoredApiKey>, ServiceError>;

    async fn api_keys_for(&self, principal_uuid: &Uuid) -> Result<Vec<StoredApiKey>, ServiceError>;

    async fn touch_api_key(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredApiKey>, ServiceError>;

    /// Returns whether a key was removed.
    async fn delete_api_key(
        &self,
        principal_uuid: &Uuid,
        first_eight: &str,
    ) -> Result<bool, ServiceError>;
}

#[derive(Default)]
pub struct InMemoryStore {
    next_principal_id: AtomicI64,
    principals: DashMap<Uuid, StoredPrincipal>,
    /// (provider, id) -> principal uuid
    identities: DashMap<(String, String), Uuid>,
    sessions: DashMap<Uuid, StoredSession>,
    /// secret hash -> key
    api_keys: DashMap<String, StoredApiKey>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_principal_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl PrincipalStore for InMemoryStore {
    async fn find_principal(&self, uuid: &Uuid) -> Result<Option<StoredPrincipal>, ServiceError> {
        Ok(self.principals.get(uuid).map(|p| p.clone()))
    }

    async fn find_principal_by_identity(
        &self,
        provider: &str,
        id: &str,
    ) -> Result<Option<StoredPrincipal>, ServiceError> {
        let uuid = match self.identities.get(&(provider.to_string(), id.to_string())) {
            Some(uuid) => *uuid,
            None => return Ok(None),
        };
        Ok(self.principals.get(&uuid).map(|p| p.clone()))
    }

    async fn find_or_create_by_identity(
        &self,
        principal_type: PrincipalType,
        roles: Vec<String>,
        identity: Identity,
    ) -> Result<StoredPrincipal, ServiceError> {
        let key = (identity.provider.clone(), identity.id.clone());

        match self.identities.entry(key) {
            Entry::Occupied(entry) => self
                .principals
                .get(entry.get())
                .map(|p| p.clone())
                .ok_or(ServiceError::PrincipalNotFound),
            Entry::Vacant(entry) => {
                let mut principal = StoredPrincipal::new(self.allocate_id(), principal_type, roles);
                principal.identities.push(identity);
                entry.insert(principal.uuid);
                self.principals.insert(principal.uuid, principal.clone());
                tracing::debug!(principal = %principal.uuid, "Principal created");
                Ok(principal)
            }
        }
    }

    async fn save_principal(&self, principal: &StoredPrincipal) -> Result<(), ServiceError> {
        let mut claimed: Vec<(String, String)> = Vec::new();
        for identity in &principal.identities {
            let key = (identity.provider.clone(), identity.id.clone());
            match self.identities.entry(key.clone()) {
                Entry::Occupied(entry) if *entry.get() != principal.uuid => {
                    drop(entry);
                    // Roll back the entries claimed by this call.
                    for key in claimed {
                        self.identities
                            .remove_if(&key, |_, owner| *owner == principal.uuid);
                    }
                    return Err(ServiceError::IdentityConflict(identity.provider.clone()));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(entry) => {
                    entry.insert(principal.uuid);
                    claimed.push(key);
                }
            }
        }

        self.principals.insert(principal.uuid, principal.clone());
        Ok(())
    }

    async fn touch_principal(&self, uuid: &Uuid, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let mut principal = self
            .principals
            .get_mut(uuid)
            .ok_or(ServiceError::PrincipalNotFound)?;
        principal.latest_activity = Some(now);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: StoredSession) -> Result<(), ServiceError> {
        self.sessions.insert(session.uuid, session);
        Ok(())
    }

    async fn get_session(&self, uuid: &Uuid) -> Result<Option<StoredSession>, ServiceError> {
        Ok(self.sessions.get(uuid).map(|s| s.clone()))
    }

    async fn sessions_for(&self, principal_uuid: &Uuid) -> Result<Vec<StoredSession>, ServiceError> {
        let mut sessions: Vec<StoredSession> = self
            .sessions
            .iter()
            .filter(|s| s.principal_uuid == *principal_uuid)
            .map(|s| s.clone())
            .collect();
        sessions.sort_by_key(|s| s.expiration_time);
        Ok(sessions)
    }

    async fn rotate_refresh(
        &self,
        uuid: &Uuid,
        presented_jti: &str,
        new_jti: String,
        now: DateTime<Utc>,
    ) -> Result<StoredSession, ServiceError> {
        // The shard write lock is held until `session` drops.
        let mut session = self
            .sessions
            .get_mut(uuid)
            .ok_or(ServiceError::SessionNotFound)?;
        session.rotate(presented_jti, new_jti, now)?;
        Ok(session.clone())
    }

    async fn revoke_session(&self, uuid: &Uuid) -> Result<StoredSession, ServiceError> {
        let mut session = self
            .sessions
            .get_mut(uuid)
            .ok_or(ServiceError::SessionNotFound)?;
        session.revoke();
        Ok(session.clone())
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryStore {
    async fn insert_api_key(&self, key: StoredApiKey) -> Result<(), ServiceError> {
        self.api_keys.insert(key.secret_hash.clone(), key);
        Ok(())
    }

    async fn find_api_keys_by_first_eight(
        &self,
        first_eight: &str,
    ) -> Result<Vec<StoredApiKey>, ServiceError> {
        Ok(self
            .api_keys
            .iter()
            .filter(|k| k.first_eight == first_eight)
            .map(|k| k.clone())
            .collect())
    }

    async fn api_keys_for(&self, principal_uuid: &Uuid) -> Result<Vec<StoredApiKey>, ServiceError> {
        let mut keys: Vec<StoredApiKey> = self
            .api_keys
            .iter()
            .filter(|k| k.principal_uuid == *principal_uuid)
            .map(|k| k.clone())
            .collect();
        keys.sort_by(|a, b| a.first_eight.cmp(&b.first_eight));
        Ok(keys)
    }

    async fn touch_api_key(
        &self,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StoredApiKey>, ServiceError> {
        Ok(self.api_keys.get_mut(secret_hash).map(|mut key| {
            key.latest_activity = Some(now);
            key.clone()
        }))
    }

    async fn delete_api_key(
        &self,
        principal_uuid: &Uuid,
        first_eight: &str,
    ) -> Result<bool, ServiceError> {
        let before = self.api_keys.len();
        self.api_keys
            .retain(|_, k| !(k.principal_uuid == *principal_uuid && k.first_eight == first_eight));
        Ok(self.api_keys.len() < before)
    }
}

//! Principal model - the authenticated user or service and its effective permissions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::api_key::{ApiKey, StoredApiKey};
use super::identity::Identity;
use super::role::RoleRegistry;
use super::session::Session;
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Service,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "user",
            PrincipalType::Service => "service",
        }
    }
}

impl std::str::FromStr for PrincipalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(PrincipalType::User),
            "service" => Ok(PrincipalType::Service),
            _ => Err(format!("Invalid principal type: {}", s)),
        }
    }
}

/// Principal as persisted. `id` is the storage row id and never leaves this record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPrincipal {
    pub id: i64,
    pub uuid: Uuid,
    pub principal_type: PrincipalType,
    pub identities: Vec<Identity>,
    pub roles: Vec<String>,
    pub latest_activity: Option<DateTime<Utc>>,
}

impl StoredPrincipal {
    pub fn new(id: i64, principal_type: PrincipalType, roles: Vec<String>) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            principal_type,
            identities: Vec::new(),
            roles,
            latest_activity: None,
        }
    }

    pub fn identity(&self, provider: &str) -> Option<&Identity> {
        self.identities.iter().find(|i| i.provider == provider)
    }

    /// Record a successful login through `provider`. A provider binds at most one identity per
    /// principal: a second, different `id` for the same provider is rejected.
    pub fn bind_identity(
        &mut self,
        provider: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if let Some(existing) = self.identities.iter_mut().find(|i| i.provider == provider) {
            if existing.id != id {
                return Err(ServiceError::IdentityConflict(provider.to_string()));
            }
            existing.record_login(now);
            return Ok(());
        }

        self.identities.push(Identity::new(provider, id, now)?);
        Ok(())
    }
}

/// How the current request authenticated.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Access/refresh token issued for a session.
    Token,
    ApiKey(&'a StoredApiKey),
}

/// Principal view returned to clients. `roles`, `scopes` and `api_key_scopes` describe the
/// current request and are recomputed every time the view is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
    pub identities: Vec<Identity>,
    pub sessions: Vec<Session>,
    pub api_keys: Vec<ApiKey>,
    pub latest_activity: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub api_key_scopes: Option<Vec<String>>,
}

impl Principal {
    pub fn from_stored_record(
        record: &StoredPrincipal,
        sessions: Vec<Session>,
        api_keys: Vec<ApiKey>,
        registry: &RoleRegistry,
        credential: Credential<'_>,
    ) -> Self {
        let role_scopes = registry.scopes_for(&record.roles);

        let (scopes, api_key_scopes) = match credential {
            Credential::Token => (role_scopes, None),
            Credential::ApiKey(key) => {
                let narrowed = key.resolve_scopes(&role_scopes);
                (narrowed.clone(), Some(narrowed))
            }
        };

        Self {
            uuid: record.uuid,
            principal_type: record.principal_type,
            identities: record.identities.clone(),
            sessions,
            api_keys,
            latest_activity: record.latest_activity,
            roles: record.roles.clone(),
            scopes: scopes.into_iter().collect(),
            api_key_scopes: api_key_scopes.map(|s| s.into_iter().collect()),
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn allowed_scopes(&self) -> AllowedScopes {
        AllowedScopes {
            roles: self.roles.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

/// Roles and currently allowed scopes of the authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedScopes {
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
}

impl AllowedScopes {
    pub fn scope_set(&self) -> BTreeSet<&str> {
        self.scopes.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{generate_secret, Role};
    use serde_json::json;

    fn registry() -> RoleRegistry {
        RoleRegistry::new([Role::new("editor", ["read:data", "write:data"])])
    }

    fn principal() -> StoredPrincipal {
        StoredPrincipal::new(42, PrincipalType::User, vec!["editor".to_string()])
    }

    #[test]
    fn test_row_id_is_never_serialized() {
        let record = principal();
        let view = Principal::from_stored_record(
            &record,
            vec![],
            vec![],
            &registry(),
            Credential::Token,
        );
        let value = serde_json::to_value(&view).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["uuid"], json!(record.uuid.to_string()));
        assert_eq!(value["type"], json!("user"));
        assert_eq!(value["api_key_scopes"], json!(null));
        assert_eq!(value["scopes"], json!(["read:data", "write:data"]));
    }

    #[test]
    fn test_api_key_narrows_scopes() {
        let record = principal();
        let key = StoredApiKey::new(
            record.uuid,
            &generate_secret(),
            None,
            None,
            vec!["read:data".to_string()],
        )
        .unwrap();

        let view = Principal::from_stored_record(
            &record,
            vec![],
            vec![],
            &registry(),
            Credential::ApiKey(&key),
        );
        assert_eq!(view.scopes, vec!["read:data".to_string()]);
        assert_eq!(view.api_key_scopes, Some(vec!["read:data".to_string()]));
        assert!(!view.has_scope("write:data"));
        assert_eq!(view.allowed_scopes().scope_set(), ["read:data"].into_iter().collect());
    }

    #[test]
    fn test_bind_identity() {
        let now = Utc::now();
        let mut record = principal();

        record.bind_identity("toy", "alice", now).unwrap();
        let later = now + chrono::Duration::minutes(5);
        record.bind_identity("toy", "alice", later).unwrap();
        assert_eq!(record.identities.len(), 1);
        assert_eq!(record.identity("toy").unwrap().latest_login, Some(later));

        record.bind_identity("orcid", "0000-0001", now).unwrap();
        assert_eq!(record.identities.len(), 2);

        let err = record.bind_identity("toy", "mallory", now).unwrap_err();
        assert!(matches!(err, ServiceError::IdentityConflict(p) if p == "toy"));
        assert_eq!(record.identity("toy").unwrap().id, "alice");
    }
}

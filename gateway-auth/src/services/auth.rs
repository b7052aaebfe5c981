use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    dtos::auth::{AccessAndRefreshTokens, ApiKeyRequestParams},
    models::{
        generate_secret, ApiKey, ApiKeyWithSecret, Credential, Identity, Principal, PrincipalType,
        RoleRegistry, Session, StoredApiKey, StoredPrincipal, StoredSession, INHERIT_SCOPE,
    },
    services::{
        jwt::expires_after, ApiKeyStore, InMemoryStore, JwtService, PrincipalStore, ServiceError,
        SessionStore,
    },
};

const TOKEN_TYPE: &str = "bearer";

#[derive(Clone)]
pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    sessions: Arc<dyn SessionStore>,
    api_keys: Arc<dyn ApiKeyStore>,
    jwt: JwtService,
    roles: Arc<RoleRegistry>,
    default_roles: Vec<String>,
    session_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        principals: Arc<dyn PrincipalStore>,
        sessions: Arc<dyn SessionStore>,
        api_keys: Arc<dyn ApiKeyStore>,
    ) -> Self {
        Self {
            principals,
            sessions,
            api_keys,
            jwt: JwtService::new(&config.jwt),
            roles: Arc::new(config.principals.registry()),
            default_roles: config.principals.default_roles.clone(),
            session_ttl_seconds: config.session.ttl_seconds,
        }
    }

    /// Service with all three stores backed by one [`InMemoryStore`].
    pub fn in_memory(config: &AuthConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(config, store.clone(), store.clone(), store)
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Record a login already verified by `provider` and open a new session.
    pub async fn login(&self, provider: &str, id: &str) -> Result<AccessAndRefreshTokens, ServiceError> {
        self.login_at(provider, id, Utc::now()).await
    }

    pub async fn login_at(
        &self,
        provider: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessAndRefreshTokens, ServiceError> {
        let expiration_time = expires_after(now, self.session_ttl_seconds)
            .ok_or_else(|| anyhow::anyhow!("Session lifetime is out of range"))?;

        let mut principal = match self.principals.find_principal_by_identity(provider, id).await? {
            Some(principal) => principal,
            None => {
                self.principals
                    .find_or_create_by_identity(
                        PrincipalType::User,
                        self.default_roles.clone(),
                        Identity::new(provider, id, now)?,
                    )
                    .await?
            }
        };

        principal.bind_identity(provider, id, now)?;
        principal.latest_activity = Some(now);
        self.principals.save_principal(&principal).await?;

        let refresh_jti = Uuid::new_v4().to_string();
        let session = StoredSession::new(principal.uuid, expiration_time, refresh_jti.clone());
        let session_uuid = session.uuid;
        self.sessions.insert_session(session).await?;

        tracing::info!(
            principal = %principal.uuid,
            provider = %provider,
            session = %session_uuid,
            "Login succeeded, session created"
        );

        self.issue_tokens(&principal, &session_uuid, &refresh_jti, now)
    }

    /// Exchange a refresh token for a new token pair. The presented token is spent.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessAndRefreshTokens, ServiceError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessAndRefreshTokens, ServiceError> {
        let claims = self.jwt.validate_refresh_token(refresh_token, now).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            ServiceError::InvalidToken
        })?;
        let principal_uuid = parse_uuid(&claims.sub)?;
        let session_uuid = parse_uuid(&claims.sid)?;

        // A token whose subject does not own the session must not rotate it.
        let owner = self
            .sessions
            .get_session(&session_uuid)
            .await?
            .ok_or(ServiceError::SessionNotFound)?
            .principal_uuid;
        if owner != principal_uuid {
            tracing::warn!(session = %session_uuid, "Refresh token subject does not own the session");
            return Err(ServiceError::InvalidToken);
        }

        let new_jti = Uuid::new_v4().to_string();
        match self
            .sessions
            .rotate_refresh(&session_uuid, &claims.jti, new_jti.clone(), now)
            .await
        {
            Ok(_) => {}
            Err(ServiceError::RefreshTokenReused) => {
                tracing::warn!(
                    principal = %principal_uuid,
                    session = %session_uuid,
                    "Superseded refresh token presented, session revoked"
                );
                return Err(ServiceError::RefreshTokenReused);
            }
            Err(e) => {
                tracing::debug!(session = %session_uuid, error = %e, "Session refresh refused");
                return Err(e);
            }
        }

        let principal = self.load_principal(&principal_uuid).await?;
        tracing::info!(principal = %principal_uuid, session = %session_uuid, "Session refreshed");

        self.issue_tokens(&principal, &session_uuid, &new_jti, now)
    }

    /// Revoke the session a refresh token belongs to.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token, Utc::now())
            .map_err(|_| ServiceError::InvalidToken)?;
        let principal_uuid = parse_uuid(&claims.sub)?;
        let session_uuid = parse_uuid(&claims.sid)?;

        self.revoke_session(&principal_uuid, &session_uuid).await?;
        tracing::info!(principal = %principal_uuid, session = %session_uuid, "Logged out");
        Ok(())
    }

    /// Revoke one of the principal's sessions. Revoking an already revoked session succeeds.
    pub async fn revoke_session(
        &self,
        principal_uuid: &Uuid,
        session_uuid: &Uuid,
    ) -> Result<(), ServiceError> {
        let owned = self
            .sessions
            .get_session(session_uuid)
            .await?
            .is_some_and(|s| s.principal_uuid == *principal_uuid);
        if !owned {
            return Err(ServiceError::SessionNotFound);
        }

        self.sessions.revoke_session(session_uuid).await?;
        tracing::info!(principal = %principal_uuid, session = %session_uuid, "Session revoked");
        Ok(())
    }

    /// Resolve the principal behind an access token.
    pub async fn authenticate_access_token(&self, access_token: &str) -> Result<Principal, ServiceError> {
        self.authenticate_access_token_at(access_token, Utc::now()).await
    }

    pub async fn authenticate_access_token_at(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, ServiceError> {
        let claims = self
            .jwt
            .validate_access_token(access_token, now)
            .map_err(|_| ServiceError::InvalidToken)?;
        let principal_uuid = parse_uuid(&claims.sub)?;
        let session_uuid = parse_uuid(&claims.sid)?;

        let session = self
            .sessions
            .get_session(&session_uuid)
            .await?
            .ok_or(ServiceError::SessionNotFound)?;
        session.validate(now)?;

        let principal = self.load_principal(&principal_uuid).await?;
        self.materialize(&principal, Credential::Token).await
    }

    /// Resolve the principal behind an API key secret and record the use.
    pub async fn authenticate_api_key(&self, secret: &str) -> Result<Principal, ServiceError> {
        self.authenticate_api_key_at(secret, Utc::now()).await
    }

    pub async fn authenticate_api_key_at(
        &self,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, ServiceError> {
        let first_eight = secret.get(..8).ok_or(ServiceError::KeyNotFound)?;
        let candidates = self.api_keys.find_api_keys_by_first_eight(first_eight).await?;
        if candidates.is_empty() {
            tracing::debug!(first_eight = %first_eight, "No API key with this prefix");
            return Err(ServiceError::KeyNotFound);
        }

        let mut matched = None;
        for candidate in candidates {
            match candidate.verify(secret, now) {
                Ok(()) => {
                    matched = Some(candidate);
                    break;
                }
                Err(ServiceError::KeySecretMismatch) => continue,
                Err(e) => {
                    tracing::debug!(first_eight = %first_eight, error = %e, "API key refused");
                    return Err(e);
                }
            }
        }
        let key = matched.ok_or_else(|| {
            tracing::warn!(first_eight = %first_eight, "API key secret mismatch");
            ServiceError::KeySecretMismatch
        })?;

        let key = self
            .api_keys
            .touch_api_key(&key.secret_hash, now)
            .await?
            .ok_or(ServiceError::KeyNotFound)?;
        self.principals.touch_principal(&key.principal_uuid, now).await?;

        let principal = self.load_principal(&key.principal_uuid).await?;
        self.materialize(&principal, Credential::ApiKey(&key)).await
    }

    /// Create an API key for an authenticated principal. The returned secret is never
    /// retrievable again.
    pub async fn create_api_key(
        &self,
        principal: &Principal,
        params: ApiKeyRequestParams,
    ) -> Result<ApiKeyWithSecret, ServiceError> {
        self.create_api_key_at(principal, params, Utc::now()).await
    }

    pub async fn create_api_key_at(
        &self,
        principal: &Principal,
        params: ApiKeyRequestParams,
        now: DateTime<Utc>,
    ) -> Result<ApiKeyWithSecret, ServiceError> {
        params.validate()?;

        let requested = params.requested_scopes();
        let scopes = if requested.iter().any(|s| s == INHERIT_SCOPE) {
            if principal.api_key_scopes.is_some() {
                // Authenticated by a key: inherit means that key's scopes, pinned.
                principal.scopes.clone()
            } else {
                vec![INHERIT_SCOPE.to_string()]
            }
        } else {
            let allowed = principal.allowed_scopes();
            let allowed = allowed.scope_set();
            let violations: BTreeSet<String> = requested
                .iter()
                .filter(|s| !allowed.contains(s.as_str()))
                .cloned()
                .collect();
            if !violations.is_empty() {
                tracing::debug!(principal = %principal.uuid, ?violations, "API key scopes refused");
                return Err(ServiceError::ScopeViolation(violations.into_iter().collect()));
            }
            requested
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let expiration_time = params
            .expires_in
            .map(|secs| {
                expires_after(now, secs)
                    .ok_or_else(|| anyhow::anyhow!("API key lifetime of {}s is out of range", secs))
            })
            .transpose()?;
        let secret = generate_secret();
        let record = StoredApiKey::new(principal.uuid, &secret, expiration_time, params.note, scopes)?;
        self.api_keys.insert_api_key(record.clone()).await?;

        tracing::info!(
            principal = %principal.uuid,
            first_eight = %record.first_eight,
            "API key created"
        );

        Ok(ApiKeyWithSecret::from_stored_record(&record, secret))
    }

    pub async fn get_api_key(
        &self,
        principal_uuid: &Uuid,
        first_eight: &str,
    ) -> Result<ApiKey, ServiceError> {
        self.api_keys
            .api_keys_for(principal_uuid)
            .await?
            .iter()
            .find(|k| k.first_eight == first_eight)
            .map(ApiKey::from_stored_record)
            .ok_or(ServiceError::KeyNotFound)
    }

    pub async fn revoke_api_key(
        &self,
        principal_uuid: &Uuid,
        first_eight: &str,
    ) -> Result<(), ServiceError> {
        if !self.api_keys.delete_api_key(principal_uuid, first_eight).await? {
            return Err(ServiceError::KeyNotFound);
        }
        tracing::info!(principal = %principal_uuid, first_eight = %first_eight, "API key revoked");
        Ok(())
    }

    /// The principal as seen through a session, scopes recomputed from its current roles.
    pub async fn whoami(&self, principal_uuid: &Uuid) -> Result<Principal, ServiceError> {
        let principal = self.load_principal(principal_uuid).await?;
        self.materialize(&principal, Credential::Token).await
    }

    /// Replace the principal's role names.
    pub async fn assign_roles(
        &self,
        principal_uuid: &Uuid,
        roles: Vec<String>,
    ) -> Result<Principal, ServiceError> {
        let mut principal = self.load_principal(principal_uuid).await?;

        let mut seen = BTreeSet::new();
        principal.roles = roles.into_iter().filter(|r| seen.insert(r.clone())).collect();
        self.principals.save_principal(&principal).await?;

        tracing::info!(principal = %principal_uuid, roles = ?principal.roles, "Roles assigned");
        self.materialize(&principal, Credential::Token).await
    }

    /// Bind another provider account to an existing principal.
    pub async fn link_identity(
        &self,
        principal_uuid: &Uuid,
        provider: &str,
        id: &str,
    ) -> Result<Principal, ServiceError> {
        let now = Utc::now();

        if let Some(owner) = self.principals.find_principal_by_identity(provider, id).await? {
            if owner.uuid != *principal_uuid {
                return Err(ServiceError::IdentityConflict(provider.to_string()));
            }
        }

        let mut principal = self.load_principal(principal_uuid).await?;
        principal.bind_identity(provider, id, now)?;
        self.principals.save_principal(&principal).await?;

        tracing::info!(principal = %principal_uuid, provider = %provider, "Identity linked");
        self.materialize(&principal, Credential::Token).await
    }

    async fn load_principal(&self, uuid: &Uuid) -> Result<StoredPrincipal, ServiceError> {
        self.principals
            .find_principal(uuid)
            .await?
            .ok_or(ServiceError::PrincipalNotFound)
    }

    async fn materialize(
        &self,
        principal: &StoredPrincipal,
        credential: Credential<'_>,
    ) -> Result<Principal, ServiceError> {
        let sessions = self
            .sessions
            .sessions_for(&principal.uuid)
            .await?
            .iter()
            .map(Session::from_stored_record)
            .collect();
        let api_keys = self
            .api_keys
            .api_keys_for(&principal.uuid)
            .await?
            .iter()
            .map(ApiKey::from_stored_record)
            .collect();

        Ok(Principal::from_stored_record(
            principal,
            sessions,
            api_keys,
            &self.roles,
            credential,
        ))
    }

    fn issue_tokens(
        &self,
        principal: &StoredPrincipal,
        session_uuid: &Uuid,
        refresh_jti: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessAndRefreshTokens, ServiceError> {
        let scopes = self.roles.scopes_for(&principal.roles).into_iter().collect();
        let access_token = self
            .jwt
            .generate_access_token(&principal.uuid, session_uuid, scopes, now)?;
        let refresh_token = self
            .jwt
            .generate_refresh_token(&principal.uuid, session_uuid, refresh_jti, now)?;

        Ok(AccessAndRefreshTokens {
            access_token,
            expires_in: self.jwt.access_token_expiry_seconds(),
            refresh_token,
            refresh_token_expires_in: self.jwt.refresh_token_expiry_seconds(),
            token_type: TOKEN_TYPE.to_string(),
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::InvalidToken)
}

mod common;

use chrono::{Duration, Utc};
use futures::future::join_all;
use gateway_auth::{services::JwtService, ServiceError};
use uuid::Uuid;

use common::{login, setup, setup_with, test_config};

#[tokio::test]
async fn test_login_issues_bearer_tokens() {
    let service = setup();

    let (tokens, principal) = login(&service, "alice").await;

    assert_eq!(tokens.token_type, "bearer");
    assert_eq!(tokens.expires_in, 900);
    assert_eq!(tokens.refresh_token_expires_in, 7 * 24 * 60 * 60);
    assert_eq!(principal.roles, vec!["user".to_string()]);
    assert_eq!(principal.sessions.len(), 1);
    assert!(!principal.sessions[0].revoked);
    assert!(principal.api_key_scopes.is_none());
    assert!(principal.has_scope("read:data"));
}

#[tokio::test]
async fn test_refresh_rotates_and_detects_reuse() {
    let service = setup();
    let (first, principal) = login(&service, "alice").await;

    // 1. The first refresh succeeds and spends the presented token
    let second = service.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);

    // 2. Replaying the spent token revokes the session
    let err = service.refresh(&first.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::RefreshTokenReused));
    assert!(err.is_authentication_failure());

    // 3. The legitimately rotated token is now dead too
    let err = service.refresh(&second.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionRevoked));

    let principal = service.whoami(&principal.uuid).await.unwrap();
    assert!(principal.sessions[0].revoked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let service = setup();
    let (tokens, principal) = login(&service, "alice").await;

    let attempts = (0..8).map(|_| {
        let service = service.clone();
        let token = tokens.refresh_token.clone();
        tokio::spawn(async move { service.refresh(&token).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("refresh task panicked"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(ServiceError::RefreshTokenReused) | Err(ServiceError::SessionRevoked)
        ));
    }

    // The losers replayed a spent token, so the session is gone for the winner too.
    let err = service.refresh(&winners[0].refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionRevoked));
    assert!(service.whoami(&principal.uuid).await.unwrap().sessions[0].revoked);
}

#[tokio::test]
async fn test_session_expiration_boundary_is_exclusive() {
    let mut config = test_config();
    config.session.ttl_seconds = 60;
    let service = setup_with(config);

    let now = Utc::now();
    let tokens = service.login_at("toy", "alice", now).await.unwrap();

    let refreshed = service
        .refresh_at(&tokens.refresh_token, now + Duration::seconds(59))
        .await
        .unwrap();

    let err = service
        .refresh_at(&refreshed.refresh_token, now + Duration::seconds(60))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SessionExpired));
}

#[tokio::test]
async fn test_revoked_session_cannot_refresh_or_authenticate() {
    let service = setup();
    let (tokens, principal) = login(&service, "alice").await;
    let session_uuid = principal.sessions[0].uuid;

    service
        .revoke_session(&principal.uuid, &session_uuid)
        .await
        .unwrap();
    // Revocation is idempotent.
    service
        .revoke_session(&principal.uuid, &session_uuid)
        .await
        .unwrap();

    let err = service.refresh(&tokens.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionRevoked));

    let err = service
        .authenticate_access_token(&tokens.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SessionRevoked));
}

#[tokio::test]
async fn test_sessions_are_private_to_their_principal() {
    let service = setup();
    let (_, alice) = login(&service, "alice").await;
    let (_, bob) = login(&service, "bob").await;

    let err = service
        .revoke_session(&bob.uuid, &alice.sessions[0].uuid)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SessionNotFound));

    let err = service
        .revoke_session(&alice.uuid, &Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SessionNotFound));
}

#[tokio::test]
async fn test_logout_revokes_only_that_session() {
    let service = setup();
    let (laptop, principal) = login(&service, "alice").await;
    let phone = service.login("toy", "alice").await.unwrap();

    service.logout(&laptop.refresh_token).await.unwrap();

    assert!(matches!(
        service.refresh(&laptop.refresh_token).await,
        Err(ServiceError::SessionRevoked)
    ));
    assert!(service.refresh(&phone.refresh_token).await.is_ok());

    let sessions = service.whoami(&principal.uuid).await.unwrap().sessions;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().filter(|s| s.revoked).count(), 1);
}

#[tokio::test]
async fn test_tokens_from_another_deployment_are_invalid() {
    let service = setup();
    let mut foreign_config = test_config();
    foreign_config.jwt.secret = "another-deployment-signing-secret-value".to_string();
    let foreign = setup_with(foreign_config);

    let (tokens, _) = login(&foreign, "alice").await;

    assert!(matches!(
        service.refresh(&tokens.refresh_token).await,
        Err(ServiceError::InvalidToken)
    ));
    assert!(matches!(
        service.refresh("garbage").await,
        Err(ServiceError::InvalidToken)
    ));
    assert!(matches!(
        service.refresh(&tokens.access_token).await,
        Err(ServiceError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_refresh_of_unknown_session() {
    let service = setup();
    let other = setup();

    // Same signing secret, but the session lives in another store.
    let (tokens, _) = login(&other, "alice").await;
    let err = service.refresh(&tokens.refresh_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionNotFound));
}

#[tokio::test]
async fn test_token_expiry_follows_the_supplied_clock() {
    let mut config = test_config();
    config.jwt.refresh_token_expiry_seconds = 60;
    let service = setup_with(config);

    let now = Utc::now();
    let tokens = service.login_at("toy", "alice", now).await.unwrap();

    let err = service
        .refresh_at(&tokens.refresh_token, now + Duration::seconds(61))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));

    let err = service
        .authenticate_access_token_at(&tokens.access_token, now + Duration::seconds(900))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));
    assert!(service
        .authenticate_access_token_at(&tokens.access_token, now + Duration::seconds(899))
        .await
        .is_ok());

    // The rejected refresh did not spend the token.
    assert!(service
        .refresh_at(&tokens.refresh_token, now + Duration::seconds(59))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_refresh_with_mismatched_subject_does_not_rotate() {
    let config = test_config();
    let jwt = JwtService::new(&config.jwt);
    let service = setup_with(config);
    let (tokens, _) = login(&service, "alice").await;
    let (_, bob) = login(&service, "bob").await;

    let now = Utc::now();
    let claims = jwt.validate_refresh_token(&tokens.refresh_token, now).unwrap();
    let session_uuid = Uuid::parse_str(&claims.sid).unwrap();
    let mismatched = jwt
        .generate_refresh_token(&bob.uuid, &session_uuid, &claims.jti, now)
        .unwrap();

    let err = service.refresh(&mismatched).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidToken));

    // Alice's token is still the current one for her session.
    assert!(service.refresh(&tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_unrepresentable_session_lifetime_fails_login() {
    let mut config = test_config();
    config.session.ttl_seconds = i64::MAX;
    let service = setup_with(config);

    let err = service.login("toy", "alice").await.unwrap_err();
    assert!(matches!(err, ServiceError::Internal(_)));
}

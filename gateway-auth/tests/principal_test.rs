mod common;

use chrono::{Duration, Utc};
use gateway_auth::{
    config::{AuthenticationConfig, ProviderConfig},
    dtos::{About, AuthenticationMode},
    models::Principal,
    ServiceError,
};
use gateway_core::axum::http::StatusCode;
use gateway_core::error::AppError;
use gateway_core::protocol::{ApiError, Envelope, Resource, SelfLinkOnly};
use serde_json::json;
use uuid::Uuid;

use common::{login, setup, strings, test_config};

#[tokio::test]
async fn test_repeat_login_updates_identity() {
    let service = setup();
    let now = Utc::now();

    let first = service.login_at("toy", "alice", now).await.unwrap();
    let later = now + Duration::minutes(10);
    service.login_at("toy", "alice", later).await.unwrap();

    let principal = service
        .authenticate_access_token(&first.access_token)
        .await
        .unwrap();
    assert_eq!(principal.identities.len(), 1);
    assert_eq!(principal.identities[0].provider, "toy");
    assert_eq!(principal.identities[0].latest_login, Some(later));
    assert_eq!(principal.latest_activity, Some(later));
    assert_eq!(principal.sessions.len(), 2);
}

#[tokio::test]
async fn test_login_rejects_oversized_identity() {
    let service = setup();
    let err = service.login("toy", &"a".repeat(256)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_link_identity() {
    let service = setup();
    let (_, alice) = login(&service, "alice").await;
    let (_, bob) = login(&service, "bob").await;

    let linked = service
        .link_identity(&alice.uuid, "orcid", "0000-0002-1825-0097")
        .await
        .unwrap();
    assert_eq!(linked.identities.len(), 2);

    // Logging in through the linked provider reaches the same principal.
    let tokens = service.login("orcid", "0000-0002-1825-0097").await.unwrap();
    let via_orcid = service
        .authenticate_access_token(&tokens.access_token)
        .await
        .unwrap();
    assert_eq!(via_orcid.uuid, alice.uuid);

    // Another principal cannot claim that account.
    let err = service
        .link_identity(&bob.uuid, "orcid", "0000-0002-1825-0097")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IdentityConflict(p) if p == "orcid"));

    // One binding per provider per principal.
    let err = service
        .link_identity(&alice.uuid, "toy", "alice-alt")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IdentityConflict(p) if p == "toy"));
}

#[tokio::test]
async fn test_unknown_principal() {
    let service = setup();
    let ghost = Uuid::new_v4();

    assert!(matches!(
        service.whoami(&ghost).await,
        Err(ServiceError::PrincipalNotFound)
    ));
    assert!(matches!(
        service.assign_roles(&ghost, strings(&["admin"])).await,
        Err(ServiceError::PrincipalNotFound)
    ));
}

#[tokio::test]
async fn test_assign_roles_recomputes_scopes() {
    let service = setup();
    let (_, principal) = login(&service, "alice").await;
    assert!(!principal.has_scope("read:principals"));

    let updated = service
        .assign_roles(&principal.uuid, strings(&["admin", "admin", "ghost"]))
        .await
        .unwrap();
    assert_eq!(updated.roles, strings(&["admin", "ghost"]));
    assert!(updated.has_scope("read:principals"));

    let allowed = updated.allowed_scopes();
    assert_eq!(allowed.roles, updated.roles);
    assert!(allowed.scope_set().contains("metrics"));
}

#[tokio::test]
async fn test_principal_serializes_inside_envelope() {
    let service = setup();
    let (_, principal) = login(&service, "alice").await;
    let base = "http://localhost:60610/api/v1";

    let resource: Resource<Principal, SelfLinkOnly> =
        Resource::new(principal.uuid, principal.clone()).with_links(SelfLinkOnly {
            self_link: format!("{}/auth/principal/{}", base, principal.uuid),
        });
    let envelope: Envelope<Resource<Principal, SelfLinkOnly>> =
        Envelope::success(resource).unwrap();
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["error"], json!(null));
    assert_eq!(value["data"]["id"], json!(principal.uuid.to_string()));
    assert_eq!(value["data"]["attributes"]["type"], "user");
    assert!(value["data"]["attributes"].get("id").is_none());
    assert_eq!(value["data"]["attributes"]["api_key_scopes"], json!(null));
    assert_eq!(
        value["data"]["links"]["self"],
        json!(format!("{}/auth/principal/{}", base, principal.uuid))
    );

    let decoded: Envelope<Resource<Principal, SelfLinkOnly>> =
        serde_json::from_value(value).unwrap();
    assert_eq!(decoded.data().map(|r| &r.attributes), Some(&principal));
}

#[tokio::test]
async fn test_service_errors_render_as_envelope_failures() {
    let cases = [
        (ServiceError::SessionRevoked, StatusCode::UNAUTHORIZED),
        (ServiceError::KeySecretMismatch, StatusCode::UNAUTHORIZED),
        (ServiceError::InvalidToken, StatusCode::UNAUTHORIZED),
        (
            ServiceError::ScopeViolation(strings(&["metrics"])),
            StatusCode::FORBIDDEN,
        ),
        (ServiceError::PrincipalNotFound, StatusCode::NOT_FOUND),
        (
            ServiceError::IdentityConflict("toy".to_string()),
            StatusCode::CONFLICT,
        ),
    ];

    for (err, status) in cases {
        let app_error = AppError::from(err);
        assert_eq!(app_error.status_code(), status);

        let body = app_error.to_api_error();
        assert_eq!(body.code, status.as_u16());

        let envelope: Envelope<()> = Envelope::failure(body.clone());
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["data"], json!(null));
        assert_eq!(value["error"]["code"], json!(status.as_u16()));
        assert_eq!(value["error"]["message"], json!(body.message));
    }

    let internal = AppError::from(ServiceError::Internal(anyhow::anyhow!("store exploded")));
    assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let ApiError { message, .. } = internal.to_api_error();
    assert!(!message.contains("exploded"));
}

#[test]
fn test_about_from_configuration() {
    let mut config = test_config();
    config.discovery.authentication = AuthenticationConfig {
        required: true,
        providers: vec![ProviderConfig {
            provider: "toy".to_string(),
            mode: AuthenticationMode::Password,
            confirmation_message: None,
        }],
    };

    let about = About::assemble(&config.discovery, &config.public_url);
    let value = serde_json::to_value(&about).unwrap();

    assert_eq!(value["api_version"], 0);
    assert_eq!(value["authentication"]["required"], true);
    assert_eq!(
        value["authentication"]["providers"][0]["links"]["auth_endpoint"],
        "http://localhost:60610/api/v1/auth/provider/toy/token"
    );
    assert_eq!(
        value["authentication"]["links"]["refresh_session"],
        "http://localhost:60610/api/v1/auth/session/refresh"
    );
    assert!(value["formats"]["array"]
        .as_array()
        .unwrap()
        .contains(&json!("application/json")));
}

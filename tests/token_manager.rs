//! Token lifecycle against a mocked OAuth endpoint.
//!
//! The store is the in-process `MemoryStore`; the marketplace is a wiremock
//! server, so every test asserts exactly how many refresh calls were made.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_sync::errors::SyncError;
use catalog_sync::meli::auth::{OAuthSettings, TokenManager, SAFETY_MARGIN_MS};
use catalog_sync::meli::client::MeliClient;
use catalog_sync::models::token::MeliToken;
use catalog_sync::store::memory::MemoryStore;
use catalog_sync::store::{TokenStore, TOKEN_ROW_ID};

fn settings(bootstrap: Option<&str>) -> OAuthSettings {
    OAuthSettings {
        client_id: Some("app-123".into()),
        client_secret: Some("app-secret".into()),
        bootstrap_refresh_token: bootstrap.map(str::to_string),
    }
}

fn manager(server: &MockServer, store: Arc<MemoryStore>, settings: OAuthSettings) -> TokenManager {
    let client = MeliClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    TokenManager::new(store, client, settings)
}

fn stored(access: &str, refresh: &str, expires_at: i64) -> MeliToken {
    MeliToken {
        access_token: access.into(),
        refresh_token: refresh.into(),
        expires_at,
    }
}

fn grant(access: &str, refresh: Option<&str>, expires_in: i64) -> ResponseTemplate {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": expires_in,
    });
    if let Some(r) = refresh {
        body["refresh_token"] = serde_json::json!(r);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn test_fresh_token_is_returned_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(grant("APP_USR-new", Some("TG-new"), 21600))
        .expect(0)
        .mount(&server)
        .await;

    let expires_at = Utc::now().timestamp_millis() + 60 * 60 * 1000;
    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-old", expires_at))
            .await,
    );
    let tokens = manager(&server, store.clone(), settings(None));

    let token = tokens.obtain_valid_token().await.unwrap();
    assert_eq!(token.access_token, "APP_USR-old");
    assert_eq!(token.expires_at, expires_at);
    assert_eq!(store.token_saves(), 0);
}

#[tokio::test]
async fn test_token_inside_safety_margin_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=app-123"))
        .and(body_string_contains("refresh_token=TG-old"))
        .respond_with(grant("APP_USR-new", Some("TG-new"), 21600))
        .expect(1)
        .mount(&server)
        .await;

    // Still valid for two minutes, which is inside the five minute margin.
    let expires_at = Utc::now().timestamp_millis() + 2 * 60 * 1000;
    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-old", expires_at))
            .await,
    );
    let tokens = manager(&server, store.clone(), settings(Some("TG-bootstrap")));

    let before = Utc::now().timestamp_millis();
    let token = tokens.obtain_valid_token().await.unwrap();
    let after = Utc::now().timestamp_millis();

    assert_eq!(token.access_token, "APP_USR-new");
    assert_eq!(token.refresh_token, "TG-new");
    assert!(token.expires_at >= before + 21600 * 1000);
    assert!(token.expires_at <= after + 21600 * 1000);
    assert!(token.expires_at > after + SAFETY_MARGIN_MS);

    assert_eq!(store.token_saves(), 1);
    let persisted = store.load_token(TOKEN_ROW_ID).await.unwrap().unwrap();
    assert_eq!(persisted, token);
}

#[tokio::test]
async fn test_second_call_after_refresh_uses_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(grant("APP_USR-new", Some("TG-new"), 21600))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-old", 0))
            .await,
    );
    let tokens = manager(&server, store.clone(), settings(None));

    let first = tokens.obtain_valid_token().await.unwrap();
    let second = tokens.obtain_valid_token().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.token_saves(), 1);
}

#[tokio::test]
async fn test_missing_row_falls_back_to_bootstrap_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=TG-bootstrap"))
        .respond_with(grant("APP_USR-first", Some("TG-rotated"), 21600))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tokens = manager(&server, store.clone(), settings(Some("TG-bootstrap")));

    let token = tokens.obtain_valid_token().await.unwrap();
    assert_eq!(token.access_token, "APP_USR-first");

    let persisted = store.load_token(TOKEN_ROW_ID).await.unwrap().unwrap();
    assert_eq!(persisted.refresh_token, "TG-rotated");
}

#[tokio::test]
async fn test_stored_refresh_token_wins_over_bootstrap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=TG-stored"))
        .respond_with(grant("APP_USR-new", Some("TG-next"), 21600))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-stored", 0))
            .await,
    );
    let tokens = manager(&server, store, settings(Some("TG-bootstrap")));

    tokens.obtain_valid_token().await.unwrap();
}

#[tokio::test]
async fn test_missing_refresh_token_in_response_keeps_the_old_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(grant("APP_USR-new", None, 21600))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-keep", 0))
            .await,
    );
    let tokens = manager(&server, store.clone(), settings(None));

    let token = tokens.obtain_valid_token().await.unwrap();
    assert_eq!(token.access_token, "APP_USR-new");
    assert_eq!(token.refresh_token, "TG-keep");
}

#[tokio::test]
async fn test_no_refresh_token_anywhere_is_a_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(grant("APP_USR-new", Some("TG-new"), 21600))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tokens = manager(&server, store.clone(), settings(None));

    let err = tokens.obtain_valid_token().await.unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)), "got {err:?}");
    assert_eq!(store.token_saves(), 0);
}

#[tokio::test]
async fn test_missing_client_credentials_is_a_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(grant("APP_USR-new", Some("TG-new"), 21600))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let tokens = manager(
        &server,
        store,
        OAuthSettings {
            client_id: Some("app-123".into()),
            client_secret: None,
            bootstrap_refresh_token: Some("TG-bootstrap".into()),
        },
    );

    let err = tokens.obtain_valid_token().await.unwrap_err();
    assert!(matches!(err, SyncError::Configuration(_)), "got {err:?}");
}

#[tokio::test]
async fn test_rejected_refresh_surfaces_status_and_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(
        MemoryStore::new()
            .with_token(TOKEN_ROW_ID, stored("APP_USR-old", "TG-revoked", 0))
            .await,
    );
    let tokens = manager(&server, store.clone(), settings(None));

    let err = tokens.obtain_valid_token().await.unwrap_err();
    match err {
        SyncError::UpstreamAuth { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected UpstreamAuth, got {other:?}"),
    }
    assert_eq!(store.token_saves(), 0);

    let persisted = store.load_token(TOKEN_ROW_ID).await.unwrap().unwrap();
    assert_eq!(persisted.refresh_token, "TG-revoked");
}

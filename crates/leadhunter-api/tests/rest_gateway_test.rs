#![allow(clippy::unwrap_used)]
// Integration tests for `RestGateway` using wiremock.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadhunter_api::rows::LEAD_SELECT;
use leadhunter_api::{Credentials, Error, Gateway, Query, RestGateway, Table, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestGateway) {
    let server = MockServer::start().await;
    let gateway = RestGateway::new(
        &server.uri(),
        SecretString::from("anon-key".to_owned()),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, gateway)
}

async fn sign_in(server: &MockServer, gateway: &RestGateway) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-jwt",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "ana@example.com" }
        })))
        .mount(server)
        .await;

    let creds = Credentials {
        email: "ana@example.com".into(),
        password: SecretString::from("s3cret".to_owned()),
    };
    gateway.sign_in_with_password(&creds).await.unwrap();
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_stores_session() {
    let (server, gateway) = setup().await;
    sign_in(&server, &gateway).await;

    let session = gateway.session().unwrap();
    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.email.as_deref(), Some("ana@example.com"));
    assert!(session.expires_at.is_some());
}

#[tokio::test]
async fn test_sign_in_failure() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let creds = Credentials {
        email: "ana@example.com".into(),
        password: SecretString::from("wrong".to_owned()),
    };
    let result = gateway.sign_in_with_password(&creds).await;

    match result {
        Err(Error::Authentication { message }) => {
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(gateway.session().is_none());
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let (server, gateway) = setup().await;
    sign_in(&server, &gateway).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway.sign_out().await.unwrap();
    assert!(gateway.session().is_none());
}

/// Sign in with a token that is already expired.
async fn sign_in_expired(server: &MockServer, gateway: &RestGateway) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "stale-jwt",
            "refresh_token": "refresh-1",
            "expires_in": 0,
            "user": { "id": "user-1", "email": "ana@example.com" }
        })))
        .expect(1)
        .mount(server)
        .await;

    let creds = Credentials {
        email: "ana@example.com".into(),
        password: SecretString::from("s3cret".to_owned()),
    };
    gateway.sign_in_with_password(&creds).await.unwrap();
}

#[tokio::test]
async fn test_expired_session_is_refreshed_before_request() {
    let (server, gateway) = setup().await;
    sign_in_expired(&server, &gateway).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-jwt",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "ana@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .and(header("authorization", "Bearer fresh-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    gateway.query(Table::Leads, &Query::new()).await.unwrap();
    gateway.query(Table::Leads, &Query::new()).await.unwrap();

    let session = gateway.session().unwrap();
    assert_eq!(session.access_token.expose_secret(), "fresh-jwt");
    assert_eq!(
        session.refresh_token.as_ref().map(|t| t.expose_secret().to_owned()).as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_rejected_refresh_fails_the_request() {
    let (server, gateway) = setup().await;
    sign_in_expired(&server, &gateway).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = gateway.query(Table::Leads, &Query::new()).await.unwrap_err();
    assert!(
        matches!(err, Error::Authentication { ref message } if message == "Invalid Refresh Token: Already Used"),
        "got {err:?}"
    );
    assert_eq!(gateway.session().unwrap().access_token.expose_secret(), "stale-jwt");
}

// ── Rows ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_sends_filters_and_session_token() {
    let (server, gateway) = setup().await;
    sign_in(&server, &gateway).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-jwt"))
        .and(query_param("select", LEAD_SELECT))
        .and(query_param("assigned_to", "eq.user-1"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "l-1", "status": "new", "companies": { "name": "Acme" } }
        ])))
        .mount(&server)
        .await;

    let query = Query::new()
        .select(LEAD_SELECT)
        .eq("assigned_to", "user-1")
        .order("created_at", false);
    let rows = gateway.query(Table::Leads, &query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["companies"]["name"], "Acme");
}

#[tokio::test]
async fn test_anonymous_query_uses_anon_key_as_bearer() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/campaigns"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let rows = gateway.query(Table::Campaigns, &Query::new()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_insert_returns_representation() {
    let (server, gateway) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/campaigns"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "name": "Q3" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "c-9", "name": "Q3" }
        ])))
        .mount(&server)
        .await;

    let rows = gateway
        .insert(Table::Campaigns, json!({ "name": "Q3" }))
        .await
        .unwrap();
    assert_eq!(rows[0]["id"], "c-9");
}

#[tokio::test]
async fn test_update_targets_row_by_id() {
    let (server, gateway) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/leads"))
        .and(query_param("id", "eq.l-7"))
        .and(body_json(json!({ "status": "won" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway
        .update(Table::Leads, "l-7", json!({ "status": "won" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_targets_row_by_id() {
    let (server, gateway) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/campaigns"))
        .and(query_param("id", "eq.c-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway.delete(Table::Campaigns, "c-1").await.unwrap();
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_unauthorized() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let err = gateway
        .query(Table::Leads, &Query::new())
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Unauthorized { ref message } if message == "JWT expired"),
        "expected Unauthorized, got: {err:?}"
    );
}

#[tokio::test]
async fn test_structured_api_error() {
    let (server, gateway) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid input value for enum lead_status: \"bogus\"",
            "code": "22P02"
        })))
        .mount(&server)
        .await;

    let err = gateway
        .update(Table::Leads, "l-1", json!({ "status": "bogus" }))
        .await
        .unwrap_err();

    match &err {
        Error::Api { status, code, .. } => {
            assert_eq!(*status, 400);
            assert_eq!(code.as_deref(), Some("22P02"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unstructured_server_error_keeps_raw_body() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/campaigns"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = gateway
        .query(Table::Campaigns, &Query::new())
        .await
        .unwrap_err();
    match err {
        Error::Api {
            status,
            message,
            code,
        } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream down");
            assert!(code.is_none());
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = gateway
        .query(Table::Leads, &Query::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}

//! Integration tests for the OAuth2 session

use super::*;
use chrono::Utc;
use oauth_integration::{
    FetchTokenParams, HttpRequest, OAuthError, RequestOptions, ResponseHookPoint, Token,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_fetch_token_and_call_api() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("authorization", "Basic Zm9vOmJhcg=="))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .respond_with(token_response(json!({"access_token": "foo", "expires_in": 3600})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer foo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = oauth2_test_session(|builder| builder);

    let before = Utc::now().timestamp();
    let token = session
        .fetch_token(
            &format!("{}/token", mock_server.uri()),
            FetchTokenParams::code("abc"),
        )
        .await
        .expect("token request failed");
    let after = Utc::now().timestamp();

    let expires_at = token.expires_at().unwrap();
    assert!(expires_at >= (before + 3600) as f64);
    assert!(expires_at <= (after + 3600) as f64);
    assert!(session.authorized());

    let response = session
        .request(
            HttpRequest::get(format!("{}/api/me", mock_server.uri())),
            RequestOptions::default(),
        )
        .await
        .expect("protected request failed");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "hello");
}

#[tokio::test]
async fn test_auto_refresh_signals_token_updated() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=sekret"))
        .respond_with(token_response(json!({"access_token": "new", "expires_in": 3600})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut expired = Token::new();
    expired.set_access_token("old");
    expired.set_refresh_token("sekret");
    expired.insert("expires_at", Utc::now().timestamp() - 60);

    let token_url = format!("{}/token", mock_server.uri());
    let mut session = oauth2_test_session(|builder| {
        builder.token(expired).auto_refresh_url(token_url.clone())
    });

    let error = session
        .request(
            HttpRequest::get(format!("{}/api/me", mock_server.uri())),
            RequestOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(error.is_token_updated());
    let updated = error.into_updated_token().unwrap();
    assert_eq!(updated.access_token(), Some("new"));
    assert_eq!(updated.refresh_token(), Some("sekret"));
    assert_eq!(session.token(), &updated);
}

#[tokio::test]
async fn test_error_response_is_typed() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "invalid_grant", "error_description": "bad code"})),
        )
        .mount(&mock_server)
        .await;

    let mut session = oauth2_test_session(|builder| builder);
    let result = session
        .fetch_token(
            &format!("{}/token", mock_server.uri()),
            FetchTokenParams::code("abc"),
        )
        .await;

    match result {
        Err(OAuthError::Provider(error)) => {
            assert_eq!(error.kind.as_str(), "invalid_grant");
            assert_eq!(error.description.as_deref(), Some("bad code"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_denied_response_exposes_status() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let mut session = oauth2_test_session(|builder| builder);
    let error = session
        .fetch_token(
            &format!("{}/token", mock_server.uri()),
            FetchTokenParams::code("abc"),
        )
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(503));
    match error {
        OAuthError::Denied(denied) => assert_eq!(denied.response.body, "maintenance"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_compliance_hook_normalizes_camel_case() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response(json!({"accessToken": "camel", "expiresIn": 60})))
        .mount(&mock_server)
        .await;

    let mut session = oauth2_test_session(|builder| builder);
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, |mut response| {
            if let Ok(Value::Object(mut token)) = serde_json::from_str::<Value>(&response.body) {
                if let Some(access_token) = token.remove("accessToken") {
                    token.insert("access_token".to_string(), access_token);
                }
                if let Some(expires_in) = token.remove("expiresIn") {
                    token.insert("expires_in".to_string(), expires_in);
                }
                token.insert("token_type".to_string(), json!("Bearer"));
                response.body = Value::Object(token).to_string();
            }
            response
        });

    let token = session
        .fetch_token(
            &format!("{}/token", mock_server.uri()),
            FetchTokenParams::code("abc"),
        )
        .await
        .expect("token request failed");

    assert_eq!(token.access_token(), Some("camel"));
    assert_eq!(token.token_type(), Some("Bearer"));
    assert_eq!(token.expires_in(), Some(60));
    assert!(!token.contains_key("accessToken"));
}

#[tokio::test]
async fn test_plain_http_rejected_without_override() {
    let mock_server = setup_mock_server().await;

    let mut session = oauth2_session("foo")
        .allow_insecure_transport(false)
        .build()
        .expect("Failed to build session");
    let result = session
        .fetch_token(
            &format!("{}/token", mock_server.uri()),
            FetchTokenParams::code("abc"),
        )
        .await;

    assert!(matches!(result, Err(OAuthError::Security(_))));
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}

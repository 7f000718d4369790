//! Integration tests for the OAuth1 session

use super::*;
use std::sync::Arc;

use oauth_integration::{
    oauth1_credential, HttpRequest, MockNonceGenerator, OAuth1Session, OAuth1State, OAuthError,
};
use wiremock::matchers::{header_exists, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_three_legged_flow() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/request_token"))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=req&oauth_token_secret=req_secret"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=access&oauth_token_secret=access_secret"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let credential = oauth1_credential("client_key")
        .client_secret("client_secret")
        .callback_uri("https://client.example.com/cb")
        .build()
        .expect("Failed to build credential");
    let mut session = OAuth1Session::new(credential)
        .expect("Failed to build session")
        .with_nonce_generator(Arc::new(MockNonceGenerator::new("nonce", "1700000000")));

    session
        .fetch_request_token(&format!("{}/request_token", mock_server.uri()), None)
        .await
        .expect("request token failed");
    assert_eq!(session.state(), OAuth1State::HasRequestToken);

    let url = session.authorization_url("https://provider.example.com/authorize", None, &[]);
    assert_eq!(url, "https://provider.example.com/authorize?oauth_token=req");

    session.parse_authorization_response(
        "https://client.example.com/cb?oauth_token=req&oauth_verifier=v123",
    );
    let token = session
        .fetch_access_token(&format!("{}/access_token", mock_server.uri()), None)
        .await
        .expect("access token failed");
    assert_eq!(token["oauth_token"], "access");
    assert!(session.authorized());

    let response = session
        .request(HttpRequest::get(format!("{}/photos", mock_server.uri())))
        .await
        .expect("protected request failed");
    assert_eq!(response.body, "[]");

    let requests = mock_server.received_requests().await.unwrap_or_default();
    let access = requests
        .iter()
        .find(|r| r.url.path() == "/access_token")
        .expect("access token request missing");
    let header = access
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(header.starts_with("OAuth "));
    assert!(header.contains("oauth_verifier=\"v123\""));
    assert!(header.contains("oauth_token=\"req\""));

    for request in &requests {
        let header = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let first_leg = request.url.path() == "/request_token";
        assert_eq!(header.contains("oauth_callback="), first_leg, "{header}");
    }
}

#[tokio::test]
async fn test_request_token_denied() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/request_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid consumer"))
        .mount(&mock_server)
        .await;

    let credential = oauth1_credential("client_key")
        .client_secret("client_secret")
        .build()
        .expect("Failed to build credential");
    let mut session = OAuth1Session::new(credential).expect("Failed to build session");

    let error = session
        .fetch_request_token(&format!("{}/request_token", mock_server.uri()), None)
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(401));
    assert!(matches!(error, OAuthError::Denied(_)));
    assert_eq!(session.state(), OAuth1State::Unauthenticated);
}

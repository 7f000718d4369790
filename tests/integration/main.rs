//! Integration tests using WireMock
//!
//! These tests drive the OAuth1 and OAuth2 sessions through the reqwest
//! transport against a local mock server.

mod oauth1_flow;
mod oauth2_flow;

use oauth_integration::{oauth2_session, OAuth2Session, ReqwestHttpTransport, TokenLogFilter};
use wiremock::{MockServer, ResponseTemplate};

/// Helper to create a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to create success response templates.
pub fn token_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// OAuth2 session allowed to talk to the plain-HTTP mock server.
pub fn oauth2_test_session(
    configure: impl FnOnce(oauth_integration::OAuth2SessionBuilder) -> oauth_integration::OAuth2SessionBuilder,
) -> OAuth2Session<ReqwestHttpTransport> {
    configure(
        oauth2_session("foo")
            .client_secret("bar")
            .allow_insecure_transport(true)
            .log_filter(TokenLogFilter::Mask),
    )
    .build()
    .expect("Failed to build session")
}

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

use crate::compliance::RequestHookPoint;
use crate::core::transport::HttpTransport;
use crate::oauth2::OAuth2Session;

/// Fitbit requires Basic client authentication on refresh requests.
pub fn fitbit_compliance_fix<T: HttpTransport>(
    mut session: OAuth2Session<T>,
    client_secret: impl Into<String>,
) -> OAuth2Session<T> {
    let client_secret = SecretString::new(client_secret.into());
    session
        .hooks_mut()
        .register_request(RequestHookPoint::RefreshToken, move |mut parts, context| {
            let credentials = format!(
                "{}:{}",
                context.client_id.as_deref().unwrap_or_default(),
                client_secret.expose_secret()
            );
            parts.set_header(
                "Authorization",
                format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(credentials)
                ),
            );
            parts
        });
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::fixes::test_support::{session_with_token, TOKEN_URL};
    use crate::core::transport::MockHttpTransport;
    use crate::oauth2::RefreshTokenParams;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_refresh_uses_basic_auth() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &json!({"access_token": "fitbit", "expires_in": 3600}));
        let mut session = fitbit_compliance_fix(session_with_token(&transport, "old"), "bar");

        session
            .refresh_token(Some(TOKEN_URL), RefreshTokenParams::default())
            .await
            .unwrap();

        let request = transport.get_last_request().unwrap();
        // base64("foo:bar")
        assert_eq!(request.header("authorization"), Some("Basic Zm9vOmJhcg=="));
    }
}

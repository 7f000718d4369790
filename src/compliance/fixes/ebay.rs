use serde_json::Value;

use crate::compliance::{rewrite_json_body, ResponseHookPoint};
use crate::core::transport::{HttpResponse, HttpTransport};
use crate::oauth2::OAuth2Session;

const NON_COMPLIANT_TOKEN_TYPES: &[&str] = &["Application Access Token", "User Access Token"];

/// eBay labels its bearer tokens with descriptive `token_type` values.
pub fn ebay_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    let hooks = session.hooks_mut();
    hooks.register_response(ResponseHookPoint::AccessToken, fix_token_type);
    hooks.register_response(ResponseHookPoint::RefreshToken, fix_token_type);
    session
}

fn fix_token_type(response: HttpResponse) -> HttpResponse {
    rewrite_json_body(response, |token| {
        let non_compliant = token
            .get("token_type")
            .and_then(Value::as_str)
            .map_or(false, |kind| NON_COMPLIANT_TOKEN_TYPES.contains(&kind));
        if non_compliant {
            token.insert("token_type".to_string(), Value::from("Bearer"));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::fixes::test_support::{session, session_with_token, TOKEN_URL};
    use crate::core::transport::MockHttpTransport;
    use crate::oauth2::{FetchTokenParams, RefreshTokenParams};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_access_token() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({"access_token": "this is the access token", "expires_in": 7200,
                    "token_type": "Application Access Token"}),
        );
        let mut session = ebay_compliance_fix(session(&transport));

        let token = session
            .fetch_token(TOKEN_URL, FetchTokenParams::code("abc"))
            .await
            .unwrap();
        assert_eq!(token.token_type(), Some("Bearer"));
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({"access_token": "renewed", "token_type": "User Access Token"}),
        );
        let mut session = ebay_compliance_fix(session_with_token(&transport, "old"));

        let token = session
            .refresh_token(Some(TOKEN_URL), RefreshTokenParams::default())
            .await
            .unwrap();
        assert_eq!(token.token_type(), Some("Bearer"));
        assert_eq!(token.refresh_token(), Some("refresh"));
    }

    #[test]
    fn test_other_token_types_kept() {
        let response = fix_token_type(HttpResponse::json(200, &json!({"token_type": "mac"})));
        assert!(response.body.contains("\"mac\""));
    }
}

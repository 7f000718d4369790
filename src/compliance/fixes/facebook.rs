use serde_json::{Map, Value};

use crate::compliance::ResponseHookPoint;
use crate::core::encoding::decode_form;
use crate::core::transport::{HttpResponse, HttpTransport};
use crate::oauth2::OAuth2Session;

/// Facebook returns the access token form-encoded and names the lifetime
/// `expires`.
pub fn facebook_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, form_token_to_json);
    session
}

fn form_token_to_json(mut response: HttpResponse) -> HttpResponse {
    // Errors come back as JSON, which does not decode as a form.
    let Some(params) = decode_form(response.body.trim()) else {
        return response;
    };

    let mut token: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if let Some(expires) = token.get("expires").cloned() {
        token.insert("expires_in".to_string(), expires);
    }
    token.insert("token_type".to_string(), Value::from("Bearer"));

    response.body = Value::Object(token).to_string();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::fixes::test_support::{session, TOKEN_URL};
    use crate::core::transport::MockHttpTransport;
    use crate::oauth2::FetchTokenParams;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_access_token() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(
            HttpResponse::new(200, "access_token=urlencoded&expires=3600")
                .with_header("content-type", "text/plain"),
        );
        let mut session = facebook_compliance_fix(session(&transport));

        let token = session
            .fetch_token(TOKEN_URL, FetchTokenParams::code("abc"))
            .await
            .unwrap();

        assert_eq!(token.access_token(), Some("urlencoded"));
        assert_eq!(token.token_type(), Some("Bearer"));
        assert_eq!(token.expires_in(), Some(3600));
        assert!(token.expires_at().is_some());
    }

    #[test]
    fn test_json_error_is_untouched() {
        let body = r#"{"error":{"message":"bad"}}"#;
        let response = form_token_to_json(HttpResponse::new(400, body));
        assert_eq!(response.body, body);
    }
}

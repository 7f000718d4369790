use crate::compliance::ResponseHookPoint;
use crate::core::transport::HttpTransport;
use crate::oauth2::OAuth2Session;

use super::inject_bearer;

/// Weibo omits `token_type`.
pub fn weibo_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, inject_bearer);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::fixes::test_support::{session, TOKEN_URL};
    use crate::core::transport::MockHttpTransport;
    use crate::oauth2::FetchTokenParams;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fetch_access_token() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &json!({"access_token": "weibo"}));
        let mut session = weibo_compliance_fix(session(&transport));

        let token = session
            .fetch_token(TOKEN_URL, FetchTokenParams::code("abc"))
            .await
            .unwrap();
        assert_eq!(token.access_token(), Some("weibo"));
        assert_eq!(token.token_type(), Some("Bearer"));
    }
}

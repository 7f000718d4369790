use serde_json::Value;

use crate::compliance::{rewrite_json_body, ResponseHookPoint};
use crate::core::transport::{HttpResponse, HttpTransport};
use crate::oauth2::OAuth2Session;

/// Douban omits `token_type`; an explicit value is kept.
pub fn douban_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, default_token_type);
    session
}

fn default_token_type(response: HttpResponse) -> HttpResponse {
    rewrite_json_body(response, |token| {
        token
            .entry("token_type")
            .or_insert_with(|| Value::from("Bearer"));
    })
}

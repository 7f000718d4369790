use serde_json::Value;

use crate::compliance::{rewrite_json_body, ResponseHookPoint};
use crate::core::transport::{HttpResponse, HttpTransport};
use crate::oauth2::OAuth2Session;

const RENAMES: &[(&str, &str)] = &[
    ("accessToken", "access_token"),
    ("expiresIn", "expires_in"),
    ("refreshToken", "refresh_token"),
];

/// plentymarkets returns the token with camelCase keys.
pub fn plentymarkets_compliance_fix<T: HttpTransport>(
    mut session: OAuth2Session<T>,
) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, snake_case_token);
    session
}

fn snake_case_token(response: HttpResponse) -> HttpResponse {
    let is_json = response
        .header("content-type")
        .map_or(false, |value| value.contains("application/json"));
    if response.status != 200 || !is_json {
        return response;
    }

    rewrite_json_body(response, |token| {
        for (camel, snake) in RENAMES {
            if let Some(value) = token.remove(*camel) {
                if !value.is_null() {
                    token.insert(snake.to_string(), value);
                }
            }
        }
        token.remove("tokenType");
        token.insert("token_type".to_string(), Value::from("Bearer"));
    })
}

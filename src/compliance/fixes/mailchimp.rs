use serde_json::Value;

use crate::compliance::{rewrite_json_body, ResponseHookPoint};
use crate::core::transport::{HttpResponse, HttpTransport};
use crate::oauth2::OAuth2Session;

/// Mailchimp tokens never expire; it reports that as `expires_in: 0` and
/// sends `scope: null`.
pub fn mailchimp_compliance_fix<T: HttpTransport>(
    mut session: OAuth2Session<T>,
) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_response(ResponseHookPoint::AccessToken, drop_placeholders);
    session
}

fn drop_placeholders(response: HttpResponse) -> HttpResponse {
    rewrite_json_body(response, |token| {
        if token.get("scope").map_or(false, Value::is_null) {
            token.remove("scope");
        }
        if token.get("expires_in").and_then(Value::as_i64) == Some(0) {
            token.remove("expires_in");
        }
    })
}

use serde_json::{Map, Value};

use crate::compliance::{RequestHookPoint, RequestParts};
use crate::core::encoding::decode_form;
use crate::core::transport::HttpTransport;
use crate::oauth2::OAuth2Session;

/// Wix expects token request bodies as JSON.
pub fn wix_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    let hooks = session.hooks_mut();
    hooks.register_request(RequestHookPoint::AccessToken, |parts, _| form_body_to_json(parts));
    hooks.register_request(RequestHookPoint::RefreshToken, |parts, _| form_body_to_json(parts));
    session
}

fn form_body_to_json(mut parts: RequestParts) -> RequestParts {
    let Some(params) = parts.body.as_deref().and_then(decode_form) else {
        return parts;
    };
    let body: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    parts.body = Some(Value::Object(body).to_string());
    parts.set_header("Content-Type", "application/json");
    parts
}

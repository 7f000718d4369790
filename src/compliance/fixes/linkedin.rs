use crate::compliance::{RequestHookPoint, ResponseHookPoint};
use crate::core::transport::HttpTransport;
use crate::oauth2::{OAuth2Session, TokenPlacement};

use super::{inject_bearer, token_query_param};

/// LinkedIn omits `token_type` and expects the token as `oauth2_access_token`.
pub fn linkedin_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    session.set_placement(TokenPlacement::Query);
    let hooks = session.hooks_mut();
    hooks.register_response(ResponseHookPoint::AccessToken, inject_bearer);
    hooks.register_request(RequestHookPoint::Protected, |parts, context| {
        token_query_param(parts, "oauth2_access_token", context.access_token.as_deref())
    });
    session
}

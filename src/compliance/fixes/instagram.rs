use crate::compliance::RequestHookPoint;
use crate::core::transport::HttpTransport;
use crate::oauth2::OAuth2Session;

use super::token_query_param;

/// Instagram expects `access_token` in the query of protected requests.
pub fn instagram_compliance_fix<T: HttpTransport>(mut session: OAuth2Session<T>) -> OAuth2Session<T> {
    session
        .hooks_mut()
        .register_request(RequestHookPoint::Protected, |parts, context| {
            token_query_param(parts, "access_token", context.access_token.as_deref())
        });
    session
}

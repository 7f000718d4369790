//! Provider Compliance Fixes
//!
//! Each fix registers hooks on a session so that a provider's deviations
//! from RFC 6749 are normalized before the token parser sees them.

mod douban;
mod ebay;
mod facebook;
mod fitbit;
mod instagram;
mod linkedin;
mod mailchimp;
mod plentymarkets;
mod slack;
mod weibo;
mod wix;

pub use douban::douban_compliance_fix;
pub use ebay::ebay_compliance_fix;
pub use facebook::facebook_compliance_fix;
pub use fitbit::fitbit_compliance_fix;
pub use instagram::instagram_compliance_fix;
pub use linkedin::linkedin_compliance_fix;
pub use mailchimp::mailchimp_compliance_fix;
pub use plentymarkets::plentymarkets_compliance_fix;
pub use slack::slack_compliance_fix;
pub use weibo::weibo_compliance_fix;
pub use wix::wix_compliance_fix;

use serde_json::Value;

use crate::compliance::RequestParts;
use crate::core::encoding::{add_params_to_url, query_params};
use crate::core::transport::HttpResponse;

/// Insert `token_type: Bearer` into a JSON token body.
pub(crate) fn inject_bearer(response: HttpResponse) -> HttpResponse {
    super::rewrite_json_body(response, |token| {
        token.insert("token_type".to_string(), Value::from("Bearer"));
    })
}

/// Append the access token as `name` to the query unless already present.
pub(crate) fn token_query_param(
    mut parts: RequestParts,
    name: &str,
    access_token: Option<&str>,
) -> RequestParts {
    let Some(access_token) = access_token else {
        return parts;
    };
    if query_params(&parts.url).iter().all(|(k, _)| k != name) {
        parts.url = add_params_to_url(&parts.url, &[(name, access_token)]);
    }
    parts
}

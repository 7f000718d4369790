//! Transport Security
//!
//! HTTPS enforcement for token endpoints and protected resources.

use crate::error::{OAuthError, SecurityError};

/// Environment variable that disables the HTTPS requirement.
pub const INSECURE_TRANSPORT_ENV: &str = "OAUTHLIB_INSECURE_TRANSPORT";

/// Interpret the value of the insecure-transport environment flag.
pub fn parse_insecure_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

/// Read the insecure-transport flag from the process environment.
pub fn insecure_transport_from_env() -> bool {
    parse_insecure_flag(std::env::var(INSECURE_TRANSPORT_ENV).ok().as_deref())
}

/// Check whether a URL uses a secure scheme.
pub fn is_secure_transport(url: &str) -> bool {
    url.get(..8)
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case("https://"))
}

/// Reject non-HTTPS URLs unless the insecure override is set.
pub fn ensure_secure_transport(url: &str, allow_insecure: bool) -> Result<(), OAuthError> {
    if allow_insecure || is_secure_transport(url) {
        return Ok(());
    }
    Err(SecurityError::InsecureTransport {
        url: url.to_string(),
    }
    .into())
}

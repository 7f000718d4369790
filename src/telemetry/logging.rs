//! Token Log Filtering
//!
//! Controls how debug messages that contain bearer tokens are emitted.
//! The filter is a plain value handed to each session, so hosts can pick a
//! mode per session instead of relying on process-wide state.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Once;

use crate::error::{ConfigurationError, OAuthError};

/// Environment variable selecting the token log filter mode.
pub const TOKEN_FILTER_ENV: &str = "OAUTH_DEBUG_MODE_TOKEN_FILTER";

/// Replacement text for masked tokens.
pub const MASK: &str = "[MASKED]";

static UNFILTERED_WARNING: Once = Once::new();

static BEARER_TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Bearer\s+([A-Za-z0-9\-._~+/]+)").ok());

fn contains_bearer(message: &str) -> bool {
    BEARER_TOKEN.as_ref().map_or(false, |re| re.is_match(message))
}

/// How debug messages carrying bearer tokens are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenLogFilter {
    /// Log messages unchanged.
    #[default]
    Default,
    /// Replace bearer tokens with `[MASKED]`.
    Mask,
    /// Drop messages containing a bearer token.
    Suppress,
}

impl TokenLogFilter {
    /// Read the mode from `OAUTH_DEBUG_MODE_TOKEN_FILTER`; unknown values
    /// fall back to [`TokenLogFilter::Default`].
    pub fn from_env() -> Self {
        std::env::var(TOKEN_FILTER_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Apply the filter, returning `None` when the message must be dropped.
    pub fn filter<'a>(&self, message: &'a str) -> Option<Cow<'a, str>> {
        match self {
            Self::Default => Some(Cow::Borrowed(message)),
            Self::Mask => match BEARER_TOKEN.as_ref() {
                Some(re) => Some(re.replace_all(message, format!("Bearer {MASK}"))),
                None => Some(Cow::Borrowed(message)),
            },
            Self::Suppress if contains_bearer(message) => None,
            Self::Suppress => Some(Cow::Borrowed(message)),
        }
    }

    /// Warn, once per process, that debug logs may contain bearer tokens.
    pub fn warn_unfiltered(&self) {
        if *self == Self::Default {
            UNFILTERED_WARNING.call_once(|| {
                tracing::warn!(
                    "Debug logs may contain access tokens; set {}=MASK or SUPPRESS to filter them",
                    TOKEN_FILTER_ENV
                );
            });
        }
    }

    /// Emit a debug event through `tracing` after filtering.
    pub fn debug(&self, message: &str) {
        if let Some(message) = self.filter(message) {
            tracing::debug!(target: "oauth_integration::token", "{}", message);
        }
    }
}

impl FromStr for TokenLogFilter {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "DEFAULT" => Ok(Self::Default),
            "MASK" => Ok(Self::Mask),
            "SUPPRESS" => Ok(Self::Suppress),
            other => Err(ConfigurationError::InvalidValue {
                field: TOKEN_FILTER_ENV.to_string(),
                message: format!("unknown mode {other}"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "Adding token header Bearer abc.DEF-123_~+/ to request";

    #[test]
    fn test_default_passes_through() {
        assert_eq!(
            TokenLogFilter::Default.filter(MESSAGE).as_deref(),
            Some(MESSAGE)
        );
    }

    #[test]
    fn test_mask_replaces_token() {
        let masked = TokenLogFilter::Mask.filter(MESSAGE).unwrap();
        assert_eq!(masked, "Adding token header Bearer [MASKED] to request");
        assert!(!masked.contains("abc.DEF"));
    }

    #[test]
    fn test_suppress_drops_only_token_messages() {
        assert!(TokenLogFilter::Suppress.filter(MESSAGE).is_none());
        assert_eq!(
            TokenLogFilter::Suppress.filter("Requesting url").as_deref(),
            Some("Requesting url")
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("mask".parse::<TokenLogFilter>().unwrap(), TokenLogFilter::Mask);
        assert_eq!(
            "SUPPRESS".parse::<TokenLogFilter>().unwrap(),
            TokenLogFilter::Suppress
        );
        assert_eq!("".parse::<TokenLogFilter>().unwrap(), TokenLogFilter::Default);
        assert!("loud".parse::<TokenLogFilter>().is_err());
    }
}

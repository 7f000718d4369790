//! Request Normalizer
//!
//! Decides whether a request body takes part in the OAuth1 signature.

use crate::core::encoding::{decode_form, Params, FORM_CONTENT_TYPE};
use crate::error::{OAuthError, SigningError};

/// How a request body participates in signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyClassification {
    /// Multipart upload. Signed with no body parameters, body left untouched.
    Multipart,
    /// Form-encoded body whose parameters are signed.
    Form {
        params: Params,
        /// Content type was unset and must be set to form-urlencoded.
        set_content_type: bool,
    },
    /// Absent or opaque body. Signed with no body parameters.
    Unsigned,
}

impl BodyClassification {
    /// Body parameters included in the signature.
    pub fn signed_params(&self) -> &[(String, String)] {
        match self {
            Self::Form { params, .. } => params,
            Self::Multipart | Self::Unsigned => &[],
        }
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Self::Form { .. })
    }
}

/// Classify a request body.
///
/// `content_type` is the media type without parameters. An explicit
/// non-form content type is never replaced, even when the body happens to
/// decode as form data.
pub fn classify(
    content_type: Option<&str>,
    has_files: bool,
    body: Option<&str>,
) -> Result<BodyClassification, OAuthError> {
    let content_type = content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    if has_files
        && content_type
            .as_deref()
            .map_or(true, |ct| ct.starts_with("multipart/"))
    {
        return Ok(BodyClassification::Multipart);
    }

    let is_form = content_type.as_deref() == Some(FORM_CONTENT_TYPE);
    let body = body.filter(|b| !b.is_empty());

    match (body, content_type.is_none()) {
        (None, _) if is_form => Ok(BodyClassification::Form {
            params: Vec::new(),
            set_content_type: false,
        }),
        (None, _) => Ok(BodyClassification::Unsigned),
        (Some(body), unset) if unset || is_form => match decode_form(body) {
            Some(params) => Ok(BodyClassification::Form {
                params,
                set_content_type: unset,
            }),
            None if is_form => Err(SigningError::UndecodableFormBody.into()),
            None => Ok(BodyClassification::Unsigned),
        },
        (Some(_), _) => Ok(BodyClassification::Unsigned),
    }
}

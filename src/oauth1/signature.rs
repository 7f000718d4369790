//! OAuth1 Signature Engine
//!
//! RFC 5849 Section 3.4: signature base string construction and the
//! HMAC-SHA1, RSA-SHA1 and PLAINTEXT signature methods.

use base64::Engine;
use ring::hmac;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use tracing::trace;
use url::Url;

use crate::core::encoding::{percent_encode, Params};
use crate::error::{ConfigurationError, OAuthError, SigningError};
use crate::oauth1::credential::{Credential, SignatureMethod};

/// Protocol version sent as `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";

/// Protocol parameters for one signing operation, in emission order.
pub fn oauth_params(credential: &Credential, nonce: &str, timestamp: &str) -> Params {
    let mut params: Params = vec![
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_timestamp".into(), timestamp.into()),
        ("oauth_version".into(), OAUTH_VERSION.into()),
        (
            "oauth_signature_method".into(),
            credential.signature_method().as_str().into(),
        ),
        ("oauth_consumer_key".into(), credential.client_key().into()),
    ];

    if let Some(token) = credential.resource_owner_key() {
        params.push(("oauth_token".into(), token.into()));
    }
    if let Some(callback) = credential.callback_uri() {
        params.push(("oauth_callback".into(), callback.into()));
    }
    if let Some(verifier) = credential.verifier() {
        params.push(("oauth_verifier".into(), verifier.into()));
    }

    params
}

/// Base string URI: lowercase scheme and host, default port dropped, no query.
pub fn base_string_uri(url: &str) -> Result<String, OAuthError> {
    let invalid = || SigningError::InvalidUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    let host = parsed.host_str().ok_or_else(invalid)?;

    let mut base = format!("{}://{}", parsed.scheme(), host.to_ascii_lowercase());
    if let Some(port) = parsed.port() {
        base.push(':');
        base.push_str(&port.to_string());
    }
    base.push_str(parsed.path());
    Ok(base)
}

/// Encode every pair, sort byte-wise by key then value, and join with `&`.
pub fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "oauth_signature")
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// `METHOD&enc(base_uri)&enc(normalized_params)`.
pub fn signature_base_string(method: &str, base_uri: &str, normalized_params: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_uri),
        percent_encode(normalized_params)
    )
}

/// `enc(client_secret)&enc(resource_owner_secret)`, empty when absent.
pub fn signing_key(client_secret: Option<&str>, resource_owner_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(client_secret.unwrap_or_default()),
        percent_encode(resource_owner_secret.unwrap_or_default())
    )
}

/// HMAC-SHA1 signature, base64 encoded.
pub fn sign_hmac_sha1(base_string: &str, key: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
    let tag = hmac::sign(&key, base_string.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
}

/// RSASSA-PKCS1-v1_5 over SHA-1, base64 encoded.
pub fn sign_rsa_sha1(base_string: &str, key: &RsaPrivateKey) -> Result<String, OAuthError> {
    let signing_key = SigningKey::<Sha1>::new(key.clone());
    let signature = signing_key
        .try_sign(base_string.as_bytes())
        .map_err(|e| SigningError::RsaFailure {
            message: e.to_string(),
        })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
}

/// Sign a request.
///
/// `params` holds the decoded URL query, any signable body parameters and
/// the protocol parameters; `oauth_signature` itself is ignored.
pub fn sign(
    credential: &Credential,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, OAuthError> {
    let key = signing_key(
        credential.client_secret(),
        credential.resource_owner_secret(),
    );

    if credential.signature_method() == SignatureMethod::Plaintext {
        return Ok(key);
    }

    let base_string = signature_base_string(
        method,
        &base_string_uri(url)?,
        &normalize_parameters(params),
    );
    trace!(base_string = %base_string, "Computed OAuth1 signature base string");

    match credential.signature_method() {
        SignatureMethod::HmacSha1 => Ok(sign_hmac_sha1(&base_string, &key)),
        SignatureMethod::RsaSha1 => {
            let rsa_key = credential
                .rsa_key()
                .ok_or(ConfigurationError::MissingRsaKey)?;
            sign_rsa_sha1(&base_string, rsa_key)
        }
        SignatureMethod::Plaintext => Ok(key),
    }
}

/// `OAuth realm="..", k="v", ...` with every key and value percent-encoded.
pub fn authorization_header(params: &[(String, String)], realm: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(params.len() + 1);
    if let Some(realm) = realm {
        parts.push(format!("realm=\"{}\"", percent_encode(realm)));
    }
    parts.extend(
        params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v))),
    );
    format!("OAuth {}", parts.join(", "))
}

//! OAuth1 Credentials
//!
//! Client and resource-owner credentials plus signing configuration.

use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigurationError, OAuthError};

/// OAuth1 signature method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureMethod {
    #[default]
    HmacSha1,
    RsaSha1,
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::RsaSha1 => "RSA-SHA1",
            Self::Plaintext => "PLAINTEXT",
        }
    }
}

impl FromStr for SignatureMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HMAC-SHA1" => Ok(Self::HmacSha1),
            "RSA-SHA1" => Ok(Self::RsaSha1),
            "PLAINTEXT" => Ok(Self::Plaintext),
            _ => Err(ConfigurationError::InvalidSignatureMethod {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the OAuth1 protocol parameters are placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureType {
    /// `Authorization: OAuth ...` header.
    #[default]
    AuthHeader,
    /// Appended to the URL query.
    Query,
    /// Appended to a form-encoded body.
    Body,
}

impl SignatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthHeader => "AUTH_HEADER",
            Self::Query => "QUERY",
            Self::Body => "BODY",
        }
    }
}

impl FromStr for SignatureType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AUTH_HEADER" | "HEADER" => Ok(Self::AuthHeader),
            "QUERY" => Ok(Self::Query),
            "BODY" => Ok(Self::Body),
            _ => Err(ConfigurationError::InvalidSignatureType {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

/// OAuth1 credentials for a single client, optionally bound to a resource owner.
///
/// Construct through [`crate::builders::OAuth1CredentialBuilder`]; the builder
/// refuses RSA-SHA1 without a usable private key.
#[derive(Clone)]
pub struct Credential {
    client_key: String,
    client_secret: Option<SecretString>,
    resource_owner_key: Option<String>,
    resource_owner_secret: Option<SecretString>,
    callback_uri: Option<String>,
    verifier: Option<String>,
    signature_method: SignatureMethod,
    signature_type: SignatureType,
    realm: Option<String>,
    rsa_key: Option<RsaPrivateKey>,
}

impl Credential {
    /// HMAC-SHA1 header-signing credential with only a client key.
    pub fn new(client_key: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            client_secret: None,
            resource_owner_key: None,
            resource_owner_secret: None,
            callback_uri: None,
            verifier: None,
            signature_method: SignatureMethod::HmacSha1,
            signature_type: SignatureType::AuthHeader,
            realm: None,
            rsa_key: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        client_key: String,
        client_secret: Option<SecretString>,
        resource_owner_key: Option<String>,
        resource_owner_secret: Option<SecretString>,
        callback_uri: Option<String>,
        verifier: Option<String>,
        signature_method: SignatureMethod,
        signature_type: SignatureType,
        realm: Option<String>,
        rsa_key: Option<RsaPrivateKey>,
    ) -> Self {
        Self {
            client_key,
            client_secret,
            resource_owner_key,
            resource_owner_secret,
            callback_uri,
            verifier,
            signature_method,
            signature_type,
            realm,
            rsa_key,
        }
    }

    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    pub fn resource_owner_key(&self) -> Option<&str> {
        self.resource_owner_key.as_deref()
    }

    pub fn resource_owner_secret(&self) -> Option<&str> {
        self.resource_owner_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
    }

    pub fn callback_uri(&self) -> Option<&str> {
        self.callback_uri.as_deref()
    }

    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    pub fn signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub(crate) fn rsa_key(&self) -> Option<&RsaPrivateKey> {
        self.rsa_key.as_ref()
    }

    pub(crate) fn set_resource_owner_key(&mut self, key: Option<String>) {
        self.resource_owner_key = key;
    }

    pub(crate) fn set_resource_owner_secret(&mut self, secret: Option<String>) {
        self.resource_owner_secret = secret.map(SecretString::new);
    }

    pub(crate) fn set_verifier(&mut self, verifier: Option<String>) {
        self.verifier = verifier;
    }

    pub(crate) fn set_realm(&mut self, realm: Option<String>) {
        self.realm = realm;
    }

    pub(crate) fn set_callback_uri(&mut self, callback_uri: Option<String>) {
        self.callback_uri = callback_uri;
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |present: bool| if present { Some("[REDACTED]") } else { None };
        f.debug_struct("Credential")
            .field("client_key", &self.client_key)
            .field("client_secret", &redacted(self.client_secret.is_some()))
            .field("resource_owner_key", &self.resource_owner_key)
            .field(
                "resource_owner_secret",
                &redacted(self.resource_owner_secret.is_some()),
            )
            .field("callback_uri", &self.callback_uri)
            .field("verifier", &self.verifier)
            .field("signature_method", &self.signature_method)
            .field("signature_type", &self.signature_type)
            .field("realm", &self.realm)
            .field("rsa_key", &redacted(self.rsa_key.is_some()))
            .finish()
    }
}

/// Parse a PEM-encoded RSA private key (PKCS#1 or PKCS#8).
pub fn parse_rsa_key(pem: &str) -> Result<RsaPrivateKey, OAuthError> {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::pkcs8::DecodePrivateKey;

    match RsaPrivateKey::from_pkcs1_pem(pem) {
        Ok(key) => Ok(key),
        Err(pkcs1_error) => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|_| {
            ConfigurationError::InvalidRsaKey {
                message: pkcs1_error.to_string(),
            }
            .into()
        }),
    }
}

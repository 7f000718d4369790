//! OAuth1 Credential Builder
//!
//! Fluent builder for OAuth1 credentials.

use secrecy::SecretString;

use crate::error::{ConfigurationError, OAuthError};
use crate::oauth1::credential::{parse_rsa_key, Credential, SignatureMethod, SignatureType};

/// OAuth1 credential builder.
#[derive(Default)]
pub struct OAuth1CredentialBuilder {
    client_key: String,
    client_secret: Option<SecretString>,
    resource_owner_key: Option<String>,
    resource_owner_secret: Option<SecretString>,
    callback_uri: Option<String>,
    verifier: Option<String>,
    signature_method: SignatureMethod,
    signature_method_name: Option<String>,
    signature_type: SignatureType,
    signature_type_name: Option<String>,
    realm: Option<String>,
    rsa_key: Option<String>,
}

impl OAuth1CredentialBuilder {
    /// Create new credential builder for a client key.
    pub fn new(client_key: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            ..Default::default()
        }
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set resource owner key (request or access token).
    pub fn resource_owner_key(mut self, key: impl Into<String>) -> Self {
        self.resource_owner_key = Some(key.into());
        self
    }

    /// Set resource owner secret.
    pub fn resource_owner_secret(mut self, secret: impl Into<String>) -> Self {
        self.resource_owner_secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Set callback URI sent with the request-token call.
    pub fn callback_uri(mut self, uri: impl Into<String>) -> Self {
        self.callback_uri = Some(uri.into());
        self
    }

    /// Set verifier.
    pub fn verifier(mut self, verifier: impl Into<String>) -> Self {
        self.verifier = Some(verifier.into());
        self
    }

    /// Set signature method.
    pub fn signature_method(mut self, method: SignatureMethod) -> Self {
        self.signature_method = method;
        self.signature_method_name = None;
        self
    }

    /// Set signature method by name, e.g. `"HMAC-SHA1"`. Validated on build.
    pub fn signature_method_name(mut self, name: impl Into<String>) -> Self {
        self.signature_method_name = Some(name.into());
        self
    }

    /// Set signature placement.
    pub fn signature_type(mut self, signature_type: SignatureType) -> Self {
        self.signature_type = signature_type;
        self.signature_type_name = None;
        self
    }

    /// Set signature placement by name, e.g. `"QUERY"`. Validated on build.
    pub fn signature_type_name(mut self, name: impl Into<String>) -> Self {
        self.signature_type_name = Some(name.into());
        self
    }

    /// Set realm for the `Authorization` header.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Set PEM-encoded RSA private key for RSA-SHA1.
    pub fn rsa_key(mut self, pem: impl Into<String>) -> Self {
        self.rsa_key = Some(pem.into());
        self
    }

    /// Build the credential.
    pub fn build(self) -> Result<Credential, OAuthError> {
        if self.client_key.is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "client_key".to_string(),
            }
            .into());
        }

        let signature_method = match &self.signature_method_name {
            Some(name) => name.parse()?,
            None => self.signature_method,
        };
        let signature_type = match &self.signature_type_name {
            Some(name) => name.parse()?,
            None => self.signature_type,
        };

        let rsa_key = match (signature_method, self.rsa_key.as_deref()) {
            (SignatureMethod::RsaSha1, None) => {
                return Err(ConfigurationError::MissingRsaKey.into())
            }
            (SignatureMethod::RsaSha1, Some(pem)) => Some(parse_rsa_key(pem)?),
            _ => None,
        };

        Ok(Credential::from_parts(
            self.client_key,
            self.client_secret,
            self.resource_owner_key,
            self.resource_owner_secret,
            self.callback_uri,
            self.verifier,
            signature_method,
            signature_type,
            self.realm,
            rsa_key,
        ))
    }
}

/// Create a new OAuth1 credential builder.
pub fn oauth1_credential(client_key: impl Into<String>) -> OAuth1CredentialBuilder {
    OAuth1CredentialBuilder::new(client_key)
}

//! OAuth1 Signer
//!
//! Signs individual HTTP requests with a [`Credential`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::encoding::{add_params_to_url, form_urlencode, query_params, FORM_CONTENT_TYPE};
use crate::core::state::{generate_token, DEFAULT_TOKEN_LENGTH};
use crate::core::transport::{HttpMethod, HttpRequest};
use crate::error::{OAuthError, SigningError};
use crate::oauth1::credential::{Credential, SignatureType};
use crate::oauth1::normalizer::{classify, BodyClassification};
use crate::oauth1::signature;

/// Source of nonces and timestamps (for dependency injection).
pub trait NonceGenerator: Send + Sync {
    /// Unique value for this request.
    fn nonce(&self) -> String;
    /// Seconds since the Unix epoch.
    fn timestamp(&self) -> String;
}

/// Random nonce and wall-clock timestamp.
#[derive(Default)]
pub struct DefaultNonceGenerator;

impl NonceGenerator for DefaultNonceGenerator {
    fn nonce(&self) -> String {
        generate_token(DEFAULT_TOKEN_LENGTH)
    }

    fn timestamp(&self) -> String {
        chrono::Utc::now().timestamp().to_string()
    }
}

/// Fixed nonce and timestamp, for tests.
pub struct MockNonceGenerator {
    nonce: String,
    timestamp: String,
}

impl MockNonceGenerator {
    pub fn new(nonce: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            timestamp: timestamp.into(),
        }
    }
}

impl NonceGenerator for MockNonceGenerator {
    fn nonce(&self) -> String {
        self.nonce.clone()
    }

    fn timestamp(&self) -> String {
        self.timestamp.clone()
    }
}

/// URL, headers and body of a signed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

/// OAuth1 request signer.
#[derive(Clone)]
pub struct OAuth1Signer {
    credential: Credential,
    nonce_generator: Arc<dyn NonceGenerator>,
}

impl OAuth1Signer {
    /// Create a signer with random nonces.
    pub fn new(credential: Credential) -> Self {
        Self::with_nonce_generator(credential, Arc::new(DefaultNonceGenerator))
    }

    /// Create a signer with a custom nonce/timestamp source.
    pub fn with_nonce_generator(
        credential: Credential,
        nonce_generator: Arc<dyn NonceGenerator>,
    ) -> Self {
        Self {
            credential,
            nonce_generator,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn credential_mut(&mut self) -> &mut Credential {
        &mut self.credential
    }

    pub(crate) fn set_nonce_generator(&mut self, nonce_generator: Arc<dyn NonceGenerator>) {
        self.nonce_generator = nonce_generator;
    }

    /// Sign a request with a fresh nonce and timestamp.
    ///
    /// Each call produces a new nonce, so signing the same request twice
    /// yields two different (both valid) signatures.
    pub fn authenticate(&self, request: HttpRequest) -> Result<HttpRequest, OAuthError> {
        let nonce = self.nonce_generator.nonce();
        let timestamp = self.nonce_generator.timestamp();
        self.authenticate_with(request, &nonce, &timestamp)
    }

    /// Sign a request with an explicit nonce and timestamp.
    pub fn authenticate_with(
        &self,
        mut request: HttpRequest,
        nonce: &str,
        timestamp: &str,
    ) -> Result<HttpRequest, OAuthError> {
        let signature_type = self.credential.signature_type();
        let content_type = request.content_type();

        let mut classification = classify(
            content_type.as_deref(),
            !request.files.is_empty(),
            request.body.as_deref(),
        )?;

        // An empty request can still carry the protocol parameters in its body.
        if signature_type == SignatureType::Body
            && classification == BodyClassification::Unsigned
            && content_type.is_none()
            && request.body.as_deref().map_or(true, str::is_empty)
        {
            classification = BodyClassification::Form {
                params: Vec::new(),
                set_content_type: true,
            };
        }

        if request.method.forbids_body_params() && !classification.signed_params().is_empty() {
            return Err(SigningError::BodyNotAllowed {
                method: request.method.to_string(),
            }
            .into());
        }
        if signature_type == SignatureType::Body && !classification.is_form() {
            return Err(SigningError::BodyNotFormEncoded.into());
        }

        if let BodyClassification::Form {
            set_content_type: true,
            ..
        } = classification
        {
            request.set_header("Content-Type", FORM_CONTENT_TYPE);
        }

        let mut oauth_params = signature::oauth_params(&self.credential, nonce, timestamp);

        let mut params = query_params(&request.url);
        params.extend_from_slice(classification.signed_params());
        params.extend_from_slice(&oauth_params);

        let signature = signature::sign(
            &self.credential,
            request.method.as_str(),
            &request.url,
            &params,
        )?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        debug!(
            method = %request.method,
            url = %request.url,
            signature_method = %self.credential.signature_method(),
            signature_type = self.credential.signature_type().as_str(),
            "Signed OAuth1 request"
        );

        match signature_type {
            SignatureType::AuthHeader => {
                let header =
                    signature::authorization_header(&oauth_params, self.credential.realm());
                request.set_header("Authorization", header);
            }
            SignatureType::Query => {
                request.url = add_params_to_url(&request.url, &oauth_params);
            }
            SignatureType::Body => {
                let mut body_params = classification.signed_params().to_vec();
                body_params.extend(oauth_params);
                request.body = Some(form_urlencode(&body_params));
            }
        }

        Ok(request)
    }

    /// Sign request components.
    pub fn sign(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&str>,
        headers: &HashMap<String, String>,
        nonce: &str,
        timestamp: &str,
    ) -> Result<SignedRequest, OAuthError> {
        let mut request = HttpRequest::new(method, url);
        request.headers = headers.clone();
        request.body = body.map(str::to_string);

        let signed = self.authenticate_with(request, nonce, timestamp)?;
        Ok(SignedRequest {
            url: signed.url,
            headers: signed.headers,
            body: signed.body,
        })
    }
}

impl fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

//! OAuth1 Session
//!
//! Three-legged OAuth1 flow: request token, user authorization, access token.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::core::encoding::{add_params_to_url, decode_form, query_params};
use crate::core::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::{OAuthError, ProtocolError, TokenError, TokenRequestDenied};
use crate::oauth1::credential::Credential;
use crate::oauth1::signer::{NonceGenerator, OAuth1Signer};
use crate::telemetry::TokenLogFilter;

/// Token parameters returned by an OAuth1 endpoint.
pub type OAuth1Token = HashMap<String, String>;

/// Position in the three-legged flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuth1State {
    Unauthenticated,
    HasRequestToken,
    HasVerifier,
    Authorized,
}

/// OAuth1 session owning a signer and an HTTP transport.
///
/// A session is meant to be driven by one caller at a time; its credential
/// is updated in place as the flow progresses.
pub struct OAuth1Session<T: HttpTransport = ReqwestHttpTransport> {
    signer: OAuth1Signer,
    transport: Arc<T>,
    state: OAuth1State,
    log_filter: TokenLogFilter,
}

impl OAuth1Session<ReqwestHttpTransport> {
    /// Create a session using the default reqwest transport.
    pub fn new(credential: Credential) -> Result<Self, OAuthError> {
        Ok(Self::with_transport(
            credential,
            Arc::new(ReqwestHttpTransport::new()?),
        ))
    }
}

impl<T: HttpTransport> OAuth1Session<T> {
    /// Create a session with a custom transport.
    pub fn with_transport(credential: Credential, transport: Arc<T>) -> Self {
        let state = match (
            credential.resource_owner_key(),
            credential.resource_owner_secret(),
            credential.verifier(),
        ) {
            (None, _, _) => OAuth1State::Unauthenticated,
            (Some(_), _, Some(_)) => OAuth1State::HasVerifier,
            (Some(_), Some(_), None) => OAuth1State::Authorized,
            (Some(_), None, None) => OAuth1State::HasRequestToken,
        };

        let log_filter = TokenLogFilter::from_env();
        log_filter.warn_unfiltered();

        Self {
            signer: OAuth1Signer::new(credential),
            transport,
            state,
            log_filter,
        }
    }

    /// Replace the nonce/timestamp source.
    pub fn with_nonce_generator(mut self, nonce_generator: Arc<dyn NonceGenerator>) -> Self {
        self.signer.set_nonce_generator(nonce_generator);
        self
    }

    /// Replace the token log filter.
    pub fn with_log_filter(mut self, log_filter: TokenLogFilter) -> Self {
        self.log_filter = log_filter;
        self
    }

    pub fn state(&self) -> OAuth1State {
        self.state
    }

    pub fn credential(&self) -> &Credential {
        self.signer.credential()
    }

    pub fn signer(&self) -> &OAuth1Signer {
        &self.signer
    }

    /// True when a resource owner key is set.
    pub fn authorized(&self) -> bool {
        self.credential()
            .resource_owner_key()
            .map_or(false, |key| !key.is_empty())
    }

    /// Current token parameters.
    pub fn token(&self) -> OAuth1Token {
        let credential = self.credential();
        [
            ("oauth_token", credential.resource_owner_key()),
            ("oauth_token_secret", credential.resource_owner_secret()),
            ("oauth_verifier", credential.verifier()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.to_string())))
        .collect()
    }

    /// Load previously stored token parameters.
    pub fn set_token(&mut self, token: &OAuth1Token) {
        self.populate(token);
        self.state = if self.authorized() {
            OAuth1State::Authorized
        } else {
            OAuth1State::Unauthenticated
        };
    }

    /// Record the verifier from the authorization callback.
    pub fn set_verifier(&mut self, verifier: impl Into<String>) {
        self.signer
            .credential_mut()
            .set_verifier(Some(verifier.into()));
        self.state = OAuth1State::HasVerifier;
    }

    /// Build the URL the user is sent to for authorization.
    ///
    /// Uses `request_token` if given, else the current resource owner key.
    pub fn authorization_url(
        &self,
        url: &str,
        request_token: Option<&str>,
        extra_params: &[(&str, &str)],
    ) -> String {
        let token = request_token.or_else(|| self.credential().resource_owner_key());

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(extra_params.len() + 1);
        if let Some(token) = token {
            params.push(("oauth_token", token));
        }
        params.extend_from_slice(extra_params);

        add_params_to_url(url, &params)
    }

    /// Extract `oauth_token` and `oauth_verifier` from the callback URL.
    pub fn parse_authorization_response(&mut self, url: &str) -> OAuth1Token {
        let token: OAuth1Token = query_params(url).into_iter().collect();
        self.populate(&token);
        if token.contains_key("oauth_verifier") {
            self.state = OAuth1State::HasVerifier;
        }
        token
    }

    /// First leg: obtain a request token.
    #[instrument(skip(self), fields(state = ?self.state))]
    pub async fn fetch_request_token(
        &mut self,
        url: &str,
        realm: Option<&[&str]>,
    ) -> Result<OAuth1Token, OAuthError> {
        let configured_realm = self.credential().realm().map(str::to_string);
        if let Some(realm) = realm {
            self.signer.credential_mut().set_realm(Some(realm.join(" ")));
        }

        let result = self.fetch_token(url).await;
        self.signer.credential_mut().set_realm(configured_realm);
        let token = result?;

        // oauth_callback belongs to the request token leg only
        self.signer.credential_mut().set_callback_uri(None);
        self.populate(&token);
        self.state = OAuth1State::HasRequestToken;
        info!("Obtained OAuth1 request token");
        Ok(token)
    }

    /// Third leg: exchange the request token and verifier for an access token.
    #[instrument(skip(self, verifier), fields(state = ?self.state))]
    pub async fn fetch_access_token(
        &mut self,
        url: &str,
        verifier: Option<&str>,
    ) -> Result<OAuth1Token, OAuthError> {
        if let Some(verifier) = verifier {
            self.set_verifier(verifier);
        }
        if self.credential().verifier().is_none() {
            return Err(TokenError::NoVerifier.into());
        }

        let token = self.fetch_token(url).await?;
        self.populate(&token);
        self.signer.credential_mut().set_verifier(None);
        self.state = OAuth1State::Authorized;
        info!("Obtained OAuth1 access token");
        Ok(token)
    }

    /// Sign and send a request.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        let signed = self.signer.authenticate(request)?;
        if let Some(header) = signed.header("Authorization") {
            self.log_filter
                .debug(&format!("Sending {} {} with {}", signed.method, signed.url, header));
        }
        self.transport.send(signed).await
    }

    async fn fetch_token(&self, url: &str) -> Result<OAuth1Token, OAuthError> {
        let response = self.request(HttpRequest::post(url)).await?;
        debug!(status = response.status, "OAuth1 token endpoint responded");
        parse_token_response(response)
    }

    fn populate(&mut self, token: &OAuth1Token) {
        let credential = self.signer.credential_mut();
        if let Some(key) = token.get("oauth_token") {
            credential.set_resource_owner_key(Some(key.clone()));
        }
        if let Some(secret) = token.get("oauth_token_secret") {
            credential.set_resource_owner_secret(Some(secret.clone()));
        }
        if let Some(verifier) = token.get("oauth_verifier") {
            credential.set_verifier(Some(verifier.clone()));
        }
    }
}

/// Parse an OAuth1 token endpoint response.
///
/// Bodies are expected to be form-encoded; JSON objects are accepted too.
pub fn parse_token_response(response: HttpResponse) -> Result<OAuth1Token, OAuthError> {
    if !response.is_success() {
        return Err(TokenRequestDenied::new(response).into());
    }

    let token: OAuth1Token = match decode_form(response.body.trim()) {
        Some(params) => params.into_iter().collect(),
        None => parse_json_token(&response.body).ok_or_else(|| {
            ProtocolError::InvalidResponse {
                message: "Unable to decode token from token response".to_string(),
            }
        })?,
    };

    if !token.contains_key("oauth_token") {
        return Err(ProtocolError::MissingField {
            field: "oauth_token".to_string(),
        }
        .into());
    }
    Ok(token)
}

fn parse_json_token(body: &str) -> Option<OAuth1Token> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
    )
}

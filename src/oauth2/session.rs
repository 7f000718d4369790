//! OAuth2 Session
//!
//! Drives the token endpoint exchanges and attaches the token to protected
//! requests, refreshing it when it has expired.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument};

use crate::compliance::{ComplianceHooks, HookContext, RequestHookPoint, ResponseHookPoint};
use crate::core::encoding::{add_params_to_url, form_urlencode, Params};
use crate::core::pkce::{PkceGenerator, PkceMethod};
use crate::core::security::ensure_secure_transport;
use crate::core::state::StateGenerator;
use crate::core::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::{ConfigurationError, OAuthError, TokenError};
use crate::oauth2::client::{OAuth2Client, TokenPlacement};
use crate::oauth2::config::{OAuth2SessionConfig, TokenUpdater};
use crate::oauth2::grant::Grant;
use crate::oauth2::token::{now_epoch, Token};
use crate::telemetry::TokenLogFilter;

const TOKEN_REQUEST_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Arguments for [`OAuth2Session::fetch_token`].
#[derive(Clone, Debug, Default)]
pub struct FetchTokenParams {
    /// Authorization code; takes precedence over `authorization_response`.
    pub code: Option<String>,
    /// Full redirect URL received from the provider.
    pub authorization_response: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    /// Overrides the configured client secret.
    pub client_secret: Option<SecretString>,
    /// Send `client_id` in the body instead of using Basic authentication.
    pub include_client_id: Option<bool>,
    /// `POST` when unset; `GET` sends parameters in the query.
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub extra_params: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl FetchTokenParams {
    /// Exchange an authorization code.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    /// Exchange the code carried by a redirect URL.
    pub fn authorization_response(url: impl Into<String>) -> Self {
        Self {
            authorization_response: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Arguments for [`OAuth2Session::refresh_token`].
#[derive(Clone, Debug, Default)]
pub struct RefreshTokenParams {
    /// Refresh token to use instead of the stored one.
    pub refresh_token: Option<String>,
    /// Basic authentication `(client_id, client_secret)`.
    pub basic_auth: Option<(String, SecretString)>,
    pub extra_params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

/// Per-call options for [`OAuth2Session::request`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Attach the session token. When false the request goes out unauthenticated.
    pub with_token: bool,
    /// Client credentials for Basic authentication on an automatic refresh.
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            with_token: true,
            client_id: None,
            client_secret: None,
        }
    }
}

impl RequestOptions {
    /// Send without the session token.
    pub fn without_token() -> Self {
        Self {
            with_token: false,
            ..Default::default()
        }
    }
}

/// OAuth2 session over an HTTP transport.
///
/// The session owns its token. It is meant to be driven by one caller at a
/// time; `request` takes `&mut self` because it may refresh the token.
pub struct OAuth2Session<T: HttpTransport = ReqwestHttpTransport> {
    client: OAuth2Client,
    transport: Arc<T>,
    hooks: ComplianceHooks,
    client_secret: Option<SecretString>,
    fixed_state: Option<String>,
    pkce: Option<PkceMethod>,
    auto_refresh_url: Option<String>,
    auto_refresh_params: Params,
    token_updater: Option<TokenUpdater>,
    state_generator: Arc<dyn StateGenerator>,
    pkce_generator: Arc<dyn PkceGenerator>,
    allow_insecure_transport: bool,
    log_filter: TokenLogFilter,
    timeout: Option<Duration>,
}

impl OAuth2Session<ReqwestHttpTransport> {
    /// Create a session using the default reqwest transport.
    pub fn new(config: OAuth2SessionConfig) -> Result<Self, OAuthError> {
        let transport = Arc::new(ReqwestHttpTransport::new()?);
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: HttpTransport> OAuth2Session<T> {
    /// Create a session with a custom transport.
    pub fn with_transport(config: OAuth2SessionConfig, transport: Arc<T>) -> Self {
        let mut client = OAuth2Client::new(config.client_id, config.grant);
        client.set_redirect_uri(config.redirect_uri);
        client.set_scope(config.scope);
        client.set_placement(config.token_placement);
        client.set_state(config.state.clone());
        if let Some(mut token) = config.token {
            if token.expires_at().is_none() {
                token.stamp_expiry(now_epoch());
            }
            client.set_token(token);
        }

        config.log_filter.warn_unfiltered();

        Self {
            client,
            transport,
            hooks: ComplianceHooks::new(),
            client_secret: config.client_secret,
            fixed_state: config.state,
            pkce: config.pkce,
            auto_refresh_url: config.auto_refresh_url,
            auto_refresh_params: config.auto_refresh_params,
            token_updater: config.token_updater,
            state_generator: config.state_generator,
            pkce_generator: config.pkce_generator,
            allow_insecure_transport: config.allow_insecure_transport,
            log_filter: config.log_filter,
            timeout: config.timeout,
        }
    }

    pub fn client(&self) -> &OAuth2Client {
        &self.client
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn hooks(&self) -> &ComplianceHooks {
        &self.hooks
    }

    /// Hook registry of this session.
    pub fn hooks_mut(&mut self) -> &mut ComplianceHooks {
        &mut self.hooks
    }

    pub fn token(&self) -> &Token {
        self.client.token()
    }

    /// Replace the token, deriving `expires_at` when it is missing.
    pub fn set_token(&mut self, mut token: Token) {
        if token.expires_at().is_none() {
            token.stamp_expiry(now_epoch());
        }
        self.client.set_token(token);
    }

    pub fn access_token(&self) -> Option<&str> {
        self.client.token().access_token()
    }

    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.client.token_mut().set_access_token(access_token);
    }

    pub fn clear_access_token(&mut self) {
        self.client.token_mut().remove("access_token");
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client.client_id()
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.client.set_client_id(Some(client_id.into()));
    }

    pub fn clear_client_id(&mut self) {
        self.client.set_client_id(None);
    }

    pub fn scope(&self) -> Option<&[String]> {
        self.client.scope()
    }

    /// State sent with the last authorization URL.
    pub fn state(&self) -> Option<&str> {
        self.client.state()
    }

    pub fn placement(&self) -> TokenPlacement {
        self.client.placement()
    }

    pub fn set_placement(&mut self, placement: TokenPlacement) {
        self.client.set_placement(placement);
    }

    /// True when an access token is held.
    pub fn authorized(&self) -> bool {
        self.access_token().map_or(false, |token| !token.is_empty())
    }

    /// Generate a CSRF state, or return the one configured up front.
    pub fn new_state(&self) -> String {
        self.fixed_state
            .clone()
            .unwrap_or_else(|| self.state_generator.generate())
    }

    /// Build the authorization URL; returns the URL and the state it carries.
    pub fn authorization_url<K, V>(
        &mut self,
        url: &str,
        extra_params: &[(K, V)],
    ) -> Result<(String, String), OAuthError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let state = self.new_state();
        let pkce = match (self.pkce, self.client.grant()) {
            (Some(method), Grant::AuthorizationCode { .. }) => {
                Some(self.pkce_generator.generate(method))
            }
            _ => None,
        };
        let url = self.client.prepare_authorization_request(
            url,
            Some(&state),
            pkce.as_ref(),
            extra_params,
        )?;
        Ok((url, state))
    }

    /// Parse an implicit-grant redirect and store the token in its fragment.
    pub fn token_from_fragment(&mut self, authorization_response: &str) -> Result<Token, OAuthError> {
        if !matches!(self.client.grant(), Grant::Implicit) {
            return Err(ConfigurationError::UnsupportedGrant {
                grant: self.client.grant().name().to_string(),
                operation: "token from fragment".to_string(),
            }
            .into());
        }
        self.client.parse_authorization_response(authorization_response)?;
        Ok(self.client.token().clone())
    }

    /// Obtain a token from the token endpoint and replace the session token.
    #[instrument(skip(self, params), fields(grant = self.client.grant().name()))]
    pub async fn fetch_token(
        &mut self,
        token_url: &str,
        params: FetchTokenParams,
    ) -> Result<Token, OAuthError> {
        ensure_secure_transport(token_url, self.allow_insecure_transport)?;

        if params.code.is_none() {
            if let Some(url) = &params.authorization_response {
                self.client.parse_authorization_response(url)?;
            }
        }

        let include_client_id = params.include_client_id.unwrap_or(false);
        let client_secret = params.client_secret.as_ref().or(self.client_secret.as_ref());

        let body = self.client.prepare_token_request(
            params.code.as_deref(),
            params.username.as_deref(),
            params.password.as_ref().map(|p| p.expose_secret().as_str()),
            include_client_id,
            client_secret.map(|s| s.expose_secret().as_str()),
            &params.extra_params,
        )?;

        let method = params.method.unwrap_or(HttpMethod::Post);
        let mut request = match method {
            HttpMethod::Post => HttpRequest::post(token_url).with_body(form_urlencode(&body)),
            HttpMethod::Get => HttpRequest::get(add_params_to_url(token_url, &body)),
            other => {
                return Err(ConfigurationError::InvalidValue {
                    field: "method".to_string(),
                    message: format!("token requests must use POST or GET, not {other}"),
                }
                .into())
            }
        };
        request.set_header("Accept", "application/json");
        request.set_header("Content-Type", TOKEN_REQUEST_CONTENT_TYPE);
        if !include_client_id {
            if let Some(client_id) = self.client.client_id() {
                let secret = client_secret.map(|s| s.expose_secret().as_str()).unwrap_or("");
                request.set_header("Authorization", basic_auth(client_id, secret));
            }
        }
        for (name, value) in &params.headers {
            request.set_header(name.as_str(), value.as_str());
        }
        request.timeout = params.timeout.or(self.timeout);

        self.hooks
            .apply_to_request(RequestHookPoint::AccessToken, &mut request, &self.hook_context());

        debug!(url = %request.url, method = %request.method, "Requesting access token");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Token endpoint responded");

        let response = self
            .hooks
            .apply_response(ResponseHookPoint::AccessToken, response);
        let token = self.client.parse_token_response(&response)?;
        self.client.set_token(token.clone());

        info!("Obtained OAuth2 access token");
        Ok(token)
    }

    /// Exchange the refresh token for a new token.
    ///
    /// The stored token is cleared before the request is sent. A response
    /// without `refresh_token` keeps the previous one.
    #[instrument(skip(self, params))]
    pub async fn refresh_token(
        &mut self,
        token_url: Option<&str>,
        params: RefreshTokenParams,
    ) -> Result<Token, OAuthError> {
        let token_url = token_url
            .map(str::to_string)
            .or_else(|| self.auto_refresh_url.clone())
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "token_url".to_string(),
            })?;
        ensure_secure_transport(&token_url, self.allow_insecure_transport)?;

        let refresh_token = params
            .refresh_token
            .clone()
            .or_else(|| self.client.token().refresh_token().map(str::to_string))
            .ok_or(TokenError::NoRefreshToken)?;

        let mut extra = self.auto_refresh_params.clone();
        extra.extend(params.extra_params.iter().cloned());
        let body = self.client.prepare_refresh_body(&refresh_token, &extra);

        self.client.clear_token();

        let mut request = HttpRequest::post(token_url.as_str()).with_body(form_urlencode(&body));
        request.set_header("Accept", "application/json");
        request.set_header("Content-Type", TOKEN_REQUEST_CONTENT_TYPE);
        if let Some((client_id, client_secret)) = &params.basic_auth {
            request.set_header(
                "Authorization",
                basic_auth(client_id, client_secret.expose_secret()),
            );
        }
        for (name, value) in &params.headers {
            request.set_header(name.as_str(), value.as_str());
        }
        request.timeout = params.timeout.or(self.timeout);

        self.hooks
            .apply_to_request(RequestHookPoint::RefreshToken, &mut request, &self.hook_context());

        debug!(url = %request.url, "Refreshing access token");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Refresh endpoint responded");

        let response = self
            .hooks
            .apply_response(ResponseHookPoint::RefreshToken, response);
        let mut token = self.client.parse_token_response(&response)?;
        if token.refresh_token().is_none() {
            debug!("No new refresh token given, keeping the previous one");
            token.set_refresh_token(refresh_token);
        }
        self.client.set_token(token.clone());

        info!("Refreshed OAuth2 access token");
        Ok(token)
    }

    /// Send a request, attaching the token and refreshing it if needed.
    ///
    /// Without a token updater a successful automatic refresh ends the call
    /// with [`OAuthError::TokenUpdated`]; the caller resubmits the request.
    pub async fn request(
        &mut self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> Result<HttpResponse, OAuthError> {
        ensure_secure_transport(&request.url, self.allow_insecure_transport)?;

        let mut request = if options.with_token && !self.client.token().is_empty() {
            match self.authenticate(request.clone()) {
                Err(OAuthError::Token(TokenError::Expired)) => {
                    self.refresh_expired(request, &options).await?
                }
                other => other?,
            }
        } else {
            request
        };

        if request.timeout.is_none() {
            request.timeout = self.timeout;
        }
        if let Some(authorization) = request.header("Authorization") {
            self.log_filter.debug(&format!(
                "Sending {} {} with Authorization {}",
                request.method, request.url, authorization
            ));
        } else {
            debug!(method = %request.method, url = %request.url, "Sending request");
        }

        self.transport.send(request).await
    }

    async fn refresh_expired(
        &mut self,
        request: HttpRequest,
        options: &RequestOptions,
    ) -> Result<HttpRequest, OAuthError> {
        let auto_refresh_url = match self.auto_refresh_url.clone() {
            Some(url) => url,
            None => return Err(TokenError::Expired.into()),
        };

        info!(url = %auto_refresh_url, "Token expired, refreshing");
        let basic_auth = match (&options.client_id, &options.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };
        let token = self
            .refresh_token(
                Some(&auto_refresh_url),
                RefreshTokenParams {
                    basic_auth,
                    ..Default::default()
                },
            )
            .await?;

        match &self.token_updater {
            Some(updater) => {
                updater(&token);
                self.authenticate(request)
            }
            None => Err(OAuthError::TokenUpdated(token)),
        }
    }

    fn authenticate(&self, mut request: HttpRequest) -> Result<HttpRequest, OAuthError> {
        self.hooks
            .apply_to_request(RequestHookPoint::Protected, &mut request, &self.hook_context());
        self.client.add_token(&mut request)?;
        Ok(request)
    }

    fn hook_context(&self) -> HookContext {
        HookContext {
            client_id: self.client.client_id().map(str::to_string),
            access_token: self.client.token().access_token().map(str::to_string),
        }
    }
}

impl<T: HttpTransport> std::fmt::Debug for OAuth2Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Session")
            .field("client", &self.client)
            .field("hooks", &self.hooks)
            .field("auto_refresh_url", &self.auto_refresh_url)
            .field("allow_insecure_transport", &self.allow_insecure_transport)
            .finish()
    }
}

fn basic_auth(client_id: &str, client_secret: &str) -> String {
    let credentials = format!("{client_id}:{client_secret}");
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

//! OAuth2 Session Configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::core::pkce::{DefaultPkceGenerator, PkceGenerator, PkceMethod};
use crate::core::security::insecure_transport_from_env;
use crate::core::state::{RandomStateGenerator, StateGenerator};
use crate::oauth2::client::TokenPlacement;
use crate::oauth2::grant::Grant;
use crate::oauth2::token::Token;
use crate::telemetry::TokenLogFilter;

/// Callback receiving every token obtained by an automatic refresh.
pub type TokenUpdater = Arc<dyn Fn(&Token) + Send + Sync>;

/// OAuth2 session configuration.
#[derive(Clone)]
pub struct OAuth2SessionConfig {
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret, used for Basic authentication at the token endpoint.
    pub client_secret: Option<SecretString>,
    /// Grant variant.
    pub grant: Grant,
    /// Redirect URI registered with the provider.
    pub redirect_uri: Option<String>,
    /// Requested scopes.
    pub scope: Option<Vec<String>>,
    /// Initial token.
    pub token: Option<Token>,
    /// Pre-set CSRF state.
    pub state: Option<String>,
    /// Access token placement on protected requests.
    pub token_placement: TokenPlacement,
    /// Enable PKCE with the given method.
    pub pkce: Option<PkceMethod>,
    /// Refresh endpoint used when a protected request finds the token expired.
    pub auto_refresh_url: Option<String>,
    /// Extra body parameters for automatic refreshes.
    pub auto_refresh_params: Vec<(String, String)>,
    /// Called with each refreshed token.
    pub token_updater: Option<TokenUpdater>,
    /// Permit plain HTTP endpoints.
    pub allow_insecure_transport: bool,
    /// Token log filter.
    pub log_filter: TokenLogFilter,
    /// Default per-request timeout.
    pub timeout: Option<Duration>,
    /// CSRF state source.
    pub state_generator: Arc<dyn StateGenerator>,
    /// PKCE verifier source.
    pub pkce_generator: Arc<dyn PkceGenerator>,
}

impl Default for OAuth2SessionConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            grant: Grant::default(),
            redirect_uri: None,
            scope: None,
            token: None,
            state: None,
            token_placement: TokenPlacement::default(),
            pkce: None,
            auto_refresh_url: None,
            auto_refresh_params: Vec::new(),
            token_updater: None,
            allow_insecure_transport: insecure_transport_from_env(),
            log_filter: TokenLogFilter::from_env(),
            timeout: None,
            state_generator: Arc::new(RandomStateGenerator::new()),
            pkce_generator: Arc::new(DefaultPkceGenerator::new()),
        }
    }
}

impl fmt::Debug for OAuth2SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2SessionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("grant", &self.grant.name())
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("token", &self.token)
            .field("token_placement", &self.token_placement)
            .field("pkce", &self.pkce)
            .field("auto_refresh_url", &self.auto_refresh_url)
            .field("token_updater", &self.token_updater.is_some())
            .field("allow_insecure_transport", &self.allow_insecure_transport)
            .field("log_filter", &self.log_filter)
            .field("timeout", &self.timeout)
            .finish()
    }
}

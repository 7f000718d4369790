//! OAuth2 Session Builder
//!
//! Fluent builder for OAuth2 sessions.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::core::pkce::{PkceGenerator, PkceMethod};
use crate::core::state::StateGenerator;
use crate::core::transport::{HttpTransport, ReqwestHttpTransport};
use crate::error::{ConfigurationError, OAuthError};
use crate::oauth2::client::TokenPlacement;
use crate::oauth2::config::OAuth2SessionConfig;
use crate::oauth2::grant::Grant;
use crate::oauth2::session::OAuth2Session;
use crate::oauth2::token::Token;
use crate::telemetry::TokenLogFilter;

/// OAuth2 session builder.
#[derive(Default)]
pub struct OAuth2SessionBuilder {
    config: OAuth2SessionConfig,
}

impl OAuth2SessionBuilder {
    /// Create new session builder for a client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            config: OAuth2SessionConfig {
                client_id: Some(client_id.into()),
                ..Default::default()
            },
        }
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set grant type.
    pub fn grant(mut self, grant: Grant) -> Self {
        self.config.grant = grant;
        self
    }

    /// Set redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.config.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set requested scopes.
    pub fn scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scope = Some(scope.into_iter().map(Into::into).collect());
        self
    }

    /// Set initial token.
    pub fn token(mut self, token: Token) -> Self {
        self.config.token = Some(token);
        self
    }

    /// Use a fixed CSRF state instead of generating one.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.config.state = Some(state.into());
        self
    }

    /// Set token placement.
    pub fn token_placement(mut self, placement: TokenPlacement) -> Self {
        self.config.token_placement = placement;
        self
    }

    /// Enable PKCE.
    pub fn pkce(mut self, method: PkceMethod) -> Self {
        self.config.pkce = Some(method);
        self
    }

    /// Set the endpoint used to refresh expired tokens automatically.
    pub fn auto_refresh_url(mut self, url: impl Into<String>) -> Self {
        self.config.auto_refresh_url = Some(url.into());
        self
    }

    /// Add a body parameter sent with automatic refreshes.
    pub fn auto_refresh_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.auto_refresh_params.push((key.into(), value.into()));
        self
    }

    /// Set the callback receiving refreshed tokens.
    pub fn token_updater<F>(mut self, updater: F) -> Self
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.config.token_updater = Some(Arc::new(updater));
        self
    }

    /// Allow plain HTTP endpoints.
    pub fn allow_insecure_transport(mut self, allow: bool) -> Self {
        self.config.allow_insecure_transport = allow;
        self
    }

    /// Set token log filter.
    pub fn log_filter(mut self, log_filter: TokenLogFilter) -> Self {
        self.config.log_filter = log_filter;
        self
    }

    /// Set default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set CSRF state generator.
    pub fn state_generator(mut self, generator: Arc<dyn StateGenerator>) -> Self {
        self.config.state_generator = generator;
        self
    }

    /// Set PKCE verifier generator.
    pub fn pkce_generator(mut self, generator: Arc<dyn PkceGenerator>) -> Self {
        self.config.pkce_generator = generator;
        self
    }

    /// Validate and return the configuration.
    pub fn build_config(self) -> Result<OAuth2SessionConfig, OAuthError> {
        if self.config.client_id.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigurationError::MissingRequired {
                field: "client_id".to_string(),
            }
            .into());
        }
        if self.config.pkce.is_some()
            && !matches!(self.config.grant, Grant::AuthorizationCode { .. })
        {
            return Err(ConfigurationError::UnsupportedGrant {
                grant: self.config.grant.name().to_string(),
                operation: "PKCE".to_string(),
            }
            .into());
        }
        Ok(self.config)
    }

    /// Build a session using the default reqwest transport.
    pub fn build(self) -> Result<OAuth2Session<ReqwestHttpTransport>, OAuthError> {
        OAuth2Session::new(self.build_config()?)
    }

    /// Build a session over a custom transport.
    pub fn build_with_transport<T: HttpTransport>(
        self,
        transport: Arc<T>,
    ) -> Result<OAuth2Session<T>, OAuthError> {
        Ok(OAuth2Session::with_transport(self.build_config()?, transport))
    }
}

/// Create a new OAuth2 session builder.
pub fn oauth2_session(client_id: impl Into<String>) -> OAuth2SessionBuilder {
    OAuth2SessionBuilder::new(client_id)
}

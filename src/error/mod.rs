//! OAuth Error Types
//!
//! Error hierarchy shared by the OAuth1 signer/session and the OAuth2 session.

use std::time::Duration;
use thiserror::Error;

use crate::core::HttpResponse;
use crate::oauth2::Token;

/// Root error type for OAuth integration.
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("{0}")]
    Denied(#[from] TokenRequestDenied),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Not a failure: the token was refreshed and no updater is configured.
    /// The caller must persist the token and resubmit the request.
    #[error("Token was refreshed, retry the request with the updated token")]
    TokenUpdated(Token),
}

impl OAuthError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH_CONFIG",
            Self::Security(_) => "OAUTH_SECURITY",
            Self::Signing(_) => "OAUTH_SIGNING",
            Self::Denied(_) => "OAUTH_DENIED",
            Self::Provider(_) => "OAUTH_PROVIDER",
            Self::Protocol(_) => "OAUTH_PROTOCOL",
            Self::Token(_) => "OAUTH_TOKEN",
            Self::Network(_) => "OAUTH_NETWORK",
            Self::TokenUpdated(_) => "OAUTH_TOKEN_UPDATED",
        }
    }

    /// True only for the "token updated, retry" signal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TokenUpdated(_))
    }

    /// Check if this is the "token updated" signal.
    pub fn is_token_updated(&self) -> bool {
        self.is_recoverable()
    }

    /// Extract the refreshed token carried by the "token updated" signal.
    pub fn into_updated_token(self) -> Option<Token> {
        match self {
            Self::TokenUpdated(token) => Some(token),
            _ => None,
        }
    }

    /// HTTP status code of a denied token request.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Denied(denied) => Some(denied.status_code),
            _ => None,
        }
    }

    /// Check if error is a transient transport failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Provider(e) => matches!(
                e.kind,
                ProviderErrorKind::ServerError | ProviderErrorKind::TemporarilyUnavailable
            ),
            _ => false,
        }
    }

    /// Check if error requires the user to authorize again.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Self::Token(TokenError::Expired) | Self::Token(TokenError::NoRefreshToken) => true,
            Self::Provider(e) => matches!(
                e.kind,
                ProviderErrorKind::InvalidGrant | ProviderErrorKind::AccessDenied
            ),
            _ => false,
        }
    }
}

/// Configuration error, raised while constructing signers and sessions.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid signature method: {value}")]
    InvalidSignatureMethod { value: String },

    #[error("Invalid signature type: {value}")]
    InvalidSignatureType { value: String },

    #[error("RSA-SHA1 signature method requires an RSA private key")]
    MissingRsaKey,

    #[error("Invalid RSA private key: {message}")]
    InvalidRsaKey { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Grant type {grant} does not support {operation}")]
    UnsupportedGrant { grant: String, operation: String },

    #[error("Unknown compliance hook point: {name}")]
    InvalidHookPoint { name: String },

    #[error("Hook kind does not match hook point {point}")]
    HookKindMismatch { point: String },

    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Security invariant violation. Never retried.
#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("OAuth requires HTTPS, refusing to use insecure transport for {url}")]
    InsecureTransport { url: String },

    #[error("State parameter mismatch (possible CSRF attack)")]
    StateMismatch {
        expected: String,
        received: Option<String>,
    },
}

/// OAuth1 request signing error.
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Content-Type indicates a form-encoded body but the body was not decodable")]
    UndecodableFormBody,

    #[error("Body signatures may only be used with form-urlencoded content")]
    BodyNotFormEncoded,

    #[error("{method} requests must not include body parameters")]
    BodyNotAllowed { method: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("RSA signing failed: {message}")]
    RsaFailure { message: String },
}

/// Token endpoint answered with a non-2xx status and no OAuth error body.
#[derive(Error, Debug)]
#[error("Token request failed with status code {status_code}")]
pub struct TokenRequestDenied {
    /// HTTP status code.
    pub status_code: u16,
    /// Raw response for inspection.
    pub response: HttpResponse,
}

impl TokenRequestDenied {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            status_code: response.status,
            response,
        }
    }
}

/// OAuth2 error codes (RFC 6749 Section 5.2 and 4.1.2.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    UnsupportedResponseType,
    InvalidScope,
    AccessDenied,
    ServerError,
    TemporarilyUnavailable,
    Other(String),
}

impl ProviderErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "invalid_request" => Self::InvalidRequest,
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "unauthorized_client" => Self::UnauthorizedClient,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            "invalid_scope" => Self::InvalidScope,
            "access_denied" => Self::AccessDenied,
            "server_error" => Self::ServerError,
            "temporarily_unavailable" => Self::TemporarilyUnavailable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::AccessDenied => "access_denied",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::Other(code) => code,
        }
    }
}

/// OAuth2 protocol error returned by the provider, typed by its `error` field.
#[derive(Error, Debug, Clone)]
#[error("{}{}", kind.as_str(), description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub description: Option<String>,
    pub uri: Option<String>,
}

/// Response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Token state error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("No access token available")]
    Missing,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("No verifier has been set")]
    NoVerifier,
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest { .. })
    }
}

/// Result type for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// OAuth2 error response from provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

impl From<OAuth2ErrorResponse> for ProviderError {
    fn from(response: OAuth2ErrorResponse) -> Self {
        Self {
            kind: ProviderErrorKind::from_code(&response.error),
            description: response.error_description,
            uri: response.error_uri,
        }
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str(body).ok()
}

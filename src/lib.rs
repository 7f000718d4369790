//! OAuth Integration Module
//!
//! OAuth 1.0a request signing and OAuth 2.0 client sessions over a pluggable
//! HTTP transport.
//!
//! # Features
//!
//! - OAuth 1.0a signatures: HMAC-SHA1, RSA-SHA1 and PLAINTEXT (RFC 5849)
//! - Three-legged OAuth 1.0a flow
//! - OAuth 2.0 authorization code, implicit, password and client credentials grants
//! - PKCE (RFC 7636)
//! - Automatic token refresh with refresh-token carry-forward
//! - Per-session compliance hooks for non-conforming providers
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth_integration::{oauth2_session, FetchTokenParams, HttpRequest, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = oauth2_session("my-client-id")
//!         .client_secret("my-client-secret")
//!         .redirect_uri("https://myapp.com/callback")
//!         .scope(["profile", "email"])
//!         .auto_refresh_url("https://provider.com/token")
//!         .build()?;
//!
//!     let (url, _state) = session.authorization_url("https://provider.com/authorize", &[("access_type", "offline")])?;
//!     println!("Visit {url}");
//!
//!     let redirect = "https://myapp.com/callback?code=...&state=...";
//!     session
//!         .fetch_token("https://provider.com/token", FetchTokenParams::authorization_response(redirect))
//!         .await?;
//!
//!     let response = session
//!         .request(HttpRequest::get("https://provider.com/api/me"), RequestOptions::default())
//!         .await?;
//!     println!("{}", response.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `core`: HTTP transport, parameter encoding, state and PKCE generation
//! - `error`: Error hierarchy
//! - `oauth1`: Signature engine, request normalization, signer and session
//! - `oauth2`: Token, grant variants, client state and session
//! - `compliance`: Hook pipeline and provider fixes
//! - `builders`: Fluent builders for credentials and sessions
//! - `telemetry`: Token log filtering

pub mod builders;
pub mod compliance;
pub mod core;
pub mod error;
pub mod oauth1;
pub mod oauth2;
pub mod telemetry;

// Re-export builders
pub use builders::{oauth1_credential, oauth2_session, OAuth1CredentialBuilder, OAuth2SessionBuilder};

// Re-export errors
pub use error::{
    parse_error_response, ConfigurationError, NetworkError, OAuth2ErrorResponse, OAuthError,
    OAuthResult, ProtocolError, ProviderError, ProviderErrorKind, SecurityError, SigningError,
    TokenError, TokenRequestDenied,
};

// Re-export core components
pub use core::{
    // Transport
    FilePart, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // State
    MockStateGenerator, RandomStateGenerator, StateGenerator,
    // PKCE
    DefaultPkceGenerator, MockPkceGenerator, PkceGenerator, PkceMethod, PkceParams,
    // Security
    INSECURE_TRANSPORT_ENV,
};

// Re-export OAuth1
pub use oauth1::{
    Credential, DefaultNonceGenerator, MockNonceGenerator, NonceGenerator, OAuth1Session,
    OAuth1Signer, OAuth1State, OAuth1Token, SignatureMethod, SignatureType,
};

// Re-export OAuth2
pub use oauth2::{
    FetchTokenParams, Grant, OAuth2Client, OAuth2Session, OAuth2SessionConfig,
    RefreshTokenParams, RequestOptions, Token, TokenPlacement,
};

// Re-export compliance
pub use compliance::{
    ComplianceHook, ComplianceHooks, HookContext, HookPoint, RequestHookPoint, RequestParts,
    ResponseHookPoint,
};

// Re-export telemetry
pub use telemetry::TokenLogFilter;

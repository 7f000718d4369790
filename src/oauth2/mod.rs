//! OAuth 2.0
//!
//! Client state per grant type, the token value type, and the session that
//! manages the token lifecycle.

pub mod client;
pub mod config;
pub mod grant;
pub mod session;
pub mod token;

pub use client::{AuthorizationResponse, OAuth2Client, TokenPlacement};
pub use config::{OAuth2SessionConfig, TokenUpdater};
pub use grant::Grant;
pub use session::{FetchTokenParams, OAuth2Session, RefreshTokenParams, RequestOptions};
pub use token::Token;

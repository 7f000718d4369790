//! Builders
//!
//! Fluent builders for OAuth1 credentials and OAuth2 sessions.

pub mod oauth1;
pub mod oauth2;

pub use oauth1::{oauth1_credential, OAuth1CredentialBuilder};
pub use oauth2::{oauth2_session, OAuth2SessionBuilder};

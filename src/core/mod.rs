//! OAuth Core Components
//!
//! Transport, encoding and randomness shared by the OAuth1 and OAuth2 layers.

pub mod encoding;
pub mod pkce;
pub mod security;
pub mod state;
pub mod transport;

pub use encoding::*;
pub use pkce::*;
pub use security::*;
pub use state::*;
pub use transport::*;

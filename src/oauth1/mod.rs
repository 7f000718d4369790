//! OAuth 1.0a
//!
//! Request signing (RFC 5849) and the three-legged authorization flow.

pub mod credential;
pub mod normalizer;
pub mod session;
pub mod signature;
pub mod signer;

pub use credential::{parse_rsa_key, Credential, SignatureMethod, SignatureType};
pub use normalizer::{classify, BodyClassification};
pub use session::{parse_token_response, OAuth1Session, OAuth1State, OAuth1Token};
pub use signer::{
    DefaultNonceGenerator, MockNonceGenerator, NonceGenerator, OAuth1Signer, SignedRequest,
};

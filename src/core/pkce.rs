//! PKCE Generator
//!
//! RFC 7636 Proof Key for Code Exchange, used by the authorization code grant.

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{ConfigurationError, OAuthError};

/// PKCE code challenge method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PkceMethod {
    /// SHA-256 hash.
    #[default]
    S256,
    /// Verifier sent as the challenge.
    Plain,
}

impl PkceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl FromStr for PkceMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S256" | "s256" => Ok(Self::S256),
            "plain" | "PLAIN" => Ok(Self::Plain),
            other => Err(ConfigurationError::InvalidValue {
                field: "code_challenge_method".to_string(),
                message: format!("unsupported method {other}"),
            }
            .into()),
        }
    }
}

/// Generated verifier/challenge pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PkceParams {
    pub code_verifier: String,
    pub code_challenge: String,
    pub code_challenge_method: PkceMethod,
}

/// PKCE generator interface (for dependency injection).
pub trait PkceGenerator: Send + Sync {
    /// Generate a fresh verifier and its challenge.
    fn generate(&self, method: PkceMethod) -> PkceParams;
}

/// Compute the code challenge for a verifier.
pub fn compute_challenge(verifier: &str, method: PkceMethod) -> String {
    match method {
        PkceMethod::Plain => verifier.to_string(),
        PkceMethod::S256 => {
            let hash = Sha256::digest(verifier.as_bytes());
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
        }
    }
}

/// Random PKCE generator.
pub struct DefaultPkceGenerator {
    verifier_length: usize,
}

impl DefaultPkceGenerator {
    /// Create new PKCE generator with default verifier length (64).
    pub fn new() -> Self {
        Self { verifier_length: 64 }
    }

    /// Create PKCE generator with custom verifier length (43 to 128).
    pub fn with_length(length: usize) -> Result<Self, OAuthError> {
        if !(43..=128).contains(&length) {
            return Err(ConfigurationError::InvalidValue {
                field: "code_verifier".to_string(),
                message: format!("length must be between 43 and 128, got {length}"),
            }
            .into());
        }
        Ok(Self {
            verifier_length: length,
        })
    }

    fn generate_verifier(&self) -> String {
        let mut rng = rand::thread_rng();
        let bytes_needed = (self.verifier_length * 3 + 3) / 4;
        let random_bytes: Vec<u8> = (0..bytes_needed).map(|_| rng.gen()).collect();

        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&random_bytes);
        encoded[..self.verifier_length].to_string()
    }
}

impl Default for DefaultPkceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PkceGenerator for DefaultPkceGenerator {
    fn generate(&self, method: PkceMethod) -> PkceParams {
        let code_verifier = self.generate_verifier();
        let code_challenge = compute_challenge(&code_verifier, method);

        PkceParams {
            code_verifier,
            code_challenge,
            code_challenge_method: method,
        }
    }
}

/// PKCE generator returning a preset verifier, for tests.
pub struct MockPkceGenerator {
    verifier: String,
    generate_count: Mutex<usize>,
}

impl MockPkceGenerator {
    pub fn new(verifier: impl Into<String>) -> Self {
        Self {
            verifier: verifier.into(),
            generate_count: Mutex::new(0),
        }
    }

    /// Number of times `generate` was called.
    pub fn generate_count(&self) -> usize {
        self.generate_count.lock().map(|count| *count).unwrap_or(0)
    }
}

impl PkceGenerator for MockPkceGenerator {
    fn generate(&self, method: PkceMethod) -> PkceParams {
        if let Ok(mut count) = self.generate_count.lock() {
            *count += 1;
        }
        PkceParams {
            code_verifier: self.verifier.clone(),
            code_challenge: compute_challenge(&self.verifier, method),
            code_challenge_method: method,
        }
    }
}

/// Validate PKCE verifier format.
pub fn is_valid_verifier(verifier: &str) -> bool {
    // RFC 7636: 43-128 unreserved characters
    (43..=128).contains(&verifier.len())
        && verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_generation() {
        let generator = DefaultPkceGenerator::new();
        let params = generator.generate(PkceMethod::S256);

        assert_eq!(params.code_verifier.len(), 64);
        assert!(is_valid_verifier(&params.code_verifier));
        assert_eq!(
            params.code_challenge,
            compute_challenge(&params.code_verifier, PkceMethod::S256)
        );
    }

    #[test]
    fn test_pkce_s256_challenge() {
        // RFC 7636 Appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            compute_challenge(verifier, PkceMethod::S256),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pkce_plain_challenge() {
        assert_eq!(compute_challenge("verifier", PkceMethod::Plain), "verifier");
    }

    #[test]
    fn test_verifier_validation() {
        assert!(is_valid_verifier(
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        ));
        assert!(!is_valid_verifier("short"));
        assert!(!is_valid_verifier(
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOE!@#"
        ));
    }

    #[test]
    fn test_invalid_verifier_length() {
        assert!(DefaultPkceGenerator::with_length(42).is_err());
        assert!(DefaultPkceGenerator::with_length(43).is_ok());
    }

    #[test]
    fn test_mock_pkce_generator() {
        let generator = MockPkceGenerator::new("fixed-verifier");
        let params = generator.generate(PkceMethod::Plain);
        assert_eq!(params.code_verifier, "fixed-verifier");
        assert_eq!(params.code_challenge, "fixed-verifier");
        assert_eq!(generator.generate_count(), 1);
    }

    #[test]
    fn test_pkce_method_from_str() {
        assert_eq!("S256".parse::<PkceMethod>().unwrap(), PkceMethod::S256);
        assert_eq!("plain".parse::<PkceMethod>().unwrap(), PkceMethod::Plain);
        assert!("md5".parse::<PkceMethod>().is_err());
    }
}

//! State and Nonce Generation
//!
//! Random token generation for the OAuth2 `state` parameter and OAuth1 nonces.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Mutex;

/// Default length of generated state values and nonces.
pub const DEFAULT_TOKEN_LENGTH: usize = 30;

/// Generate a random alphanumeric token.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// State generator interface (for dependency injection).
pub trait StateGenerator: Send + Sync {
    /// Produce a fresh state value.
    fn generate(&self) -> String;
}

/// Cryptographically random state generator.
pub struct RandomStateGenerator {
    length: usize,
}

impl RandomStateGenerator {
    /// Create a generator producing 30-character states.
    pub fn new() -> Self {
        Self::with_length(DEFAULT_TOKEN_LENGTH)
    }

    /// Create a generator with a custom state length.
    pub fn with_length(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomStateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGenerator for RandomStateGenerator {
    fn generate(&self) -> String {
        generate_token(self.length)
    }
}

/// Generator that replays a fixed sequence of states, for tests.
#[derive(Default)]
pub struct MockStateGenerator {
    states: Mutex<Vec<String>>,
    fallback: String,
}

impl MockStateGenerator {
    /// Always return the same state.
    pub fn fixed(state: impl Into<String>) -> Self {
        Self {
            states: Mutex::new(Vec::new()),
            fallback: state.into(),
        }
    }

    /// Return the given states in order, then repeat the last one.
    pub fn sequence<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut states: Vec<String> = states.into_iter().map(Into::into).collect();
        let fallback = states.last().cloned().unwrap_or_default();
        states.reverse();
        Self {
            states: Mutex::new(states),
            fallback,
        }
    }
}

impl StateGenerator for MockStateGenerator {
    fn generate(&self) -> String {
        self.states
            .lock()
            .ok()
            .and_then(|mut states| states.pop())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

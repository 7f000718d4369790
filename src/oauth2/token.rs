//! OAuth2 Token
//!
//! Token value type wrapping the token-endpoint response mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{OAuthError, ProtocolError};

/// Keys whose values are redacted from `Debug` output.
const SECRET_KEYS: &[&str] = &["access_token", "refresh_token", "id_token"];

/// OAuth2 token.
///
/// A mapping from string keys to JSON values; recognized keys are exposed
/// through accessors, everything else the provider returns is kept as-is.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(Map<String, Value>);

impl Token {
    /// Empty token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a JSON object.
    pub fn from_json(body: &str) -> Result<Self, OAuthError> {
        let value: Value = serde_json::from_str(body).map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ProtocolError::InvalidJson {
                message: "token response is not a JSON object".to_string(),
            }
            .into()),
        }
    }

    /// Token from string pairs, e.g. a URI fragment.
    pub fn from_params<K, V>(params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self(
            params
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), Value::String(v.as_ref().to_string())))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get_str("access_token")
    }

    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.insert("access_token", access_token.into());
    }

    pub fn token_type(&self) -> Option<&str> {
        self.get_str("token_type")
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.get_str("refresh_token")
    }

    pub fn set_refresh_token(&mut self, refresh_token: impl Into<String>) {
        self.insert("refresh_token", refresh_token.into());
    }

    /// Lifetime in seconds; numeric strings are accepted.
    pub fn expires_in(&self) -> Option<i64> {
        self.get("expires_in")
            .and_then(as_number)
            .filter(|n| n.is_finite())
            .map(|n| n as i64)
    }

    /// Absolute expiry in epoch seconds.
    pub fn expires_at(&self) -> Option<f64> {
        self.get("expires_at").and_then(as_number)
    }

    /// Granted scopes, from a space-separated string or a list.
    pub fn scope(&self) -> Option<Vec<String>> {
        match self.get("scope")? {
            Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Derive `expires_at` from `expires_in` relative to `now`.
    ///
    /// A null `expires_in` is dropped; non-numeric values are left alone.
    pub fn stamp_expiry(&mut self, now: i64) {
        match self.get("expires_in") {
            Some(Value::Null) => {
                self.remove("expires_in");
            }
            Some(_) => {
                if let Some(expires_in) = self.expires_in() {
                    self.insert("expires_at", now.saturating_add(expires_in));
                }
            }
            None => {}
        }
    }

    /// Whether `expires_at` lies before `now`. Tokens without expiry never expire.
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.expires_at().map_or(false, |expires_at| expires_at < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch() as f64)
    }
}

/// Current time in epoch seconds.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl From<Map<String, Value>> for Token {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if SECRET_KEYS.contains(&key.as_str()) {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

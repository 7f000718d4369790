//! OAuth2 Grant Types
//!
//! The grant variants differ only in the authorization `response_type` they
//! request and the body parameters they add to the token request.

use secrecy::{ExposeSecret, SecretString};

use crate::core::encoding::Params;
use crate::error::{ConfigurationError, OAuthError};

/// OAuth2 grant variant held by a client.
#[derive(Clone, Debug)]
pub enum Grant {
    /// Authorization code grant (RFC 6749 Section 4.1).
    AuthorizationCode { code: Option<String> },
    /// Implicit grant (RFC 6749 Section 4.2).
    Implicit,
    /// Resource owner password credentials grant (RFC 6749 Section 4.3).
    Password {
        username: Option<String>,
        password: Option<SecretString>,
    },
    /// Client credentials grant (RFC 6749 Section 4.4).
    ClientCredentials,
}

impl Default for Grant {
    fn default() -> Self {
        Self::AuthorizationCode { code: None }
    }
}

impl Grant {
    pub fn authorization_code() -> Self {
        Self::AuthorizationCode { code: None }
    }

    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: Some(username.into()),
            password: Some(SecretString::new(password.into())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::Implicit => "implicit",
            Self::Password { .. } => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }

    /// `response_type` for the authorization redirect, if the grant has one.
    pub fn response_type(&self) -> Option<&'static str> {
        match self {
            Self::AuthorizationCode { .. } => Some("code"),
            Self::Implicit => Some("token"),
            _ => None,
        }
    }

    /// `grant_type` for the token request, if the grant has one.
    pub fn grant_type(&self) -> Option<&'static str> {
        match self {
            Self::AuthorizationCode { .. } => Some("authorization_code"),
            Self::Implicit => None,
            Self::Password { .. } => Some("password"),
            Self::ClientCredentials => Some("client_credentials"),
        }
    }

    /// Whether the grant round-trips a CSRF state through a redirect.
    pub fn uses_state(&self) -> bool {
        matches!(self, Self::AuthorizationCode { .. } | Self::Implicit)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::AuthorizationCode { code } => code.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn set_code(&mut self, value: Option<String>) {
        if let Self::AuthorizationCode { code } = self {
            *code = value;
        }
    }

    /// Grant-specific token request parameters.
    ///
    /// Arguments override values stored on the grant.
    pub fn token_request_params(
        &self,
        code: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Params, OAuthError> {
        let grant_type = self.grant_type().ok_or_else(|| ConfigurationError::UnsupportedGrant {
            grant: self.name().to_string(),
            operation: "token request".to_string(),
        })?;

        let mut params = vec![("grant_type".to_string(), grant_type.to_string())];

        match self {
            Self::AuthorizationCode { code: stored } => {
                let code = code
                    .or(stored.as_deref())
                    .ok_or_else(|| missing("code"))?;
                params.push(("code".to_string(), code.to_string()));
            }
            Self::Password {
                username: stored_username,
                password: stored_password,
            } => {
                let username = username
                    .or(stored_username.as_deref())
                    .ok_or_else(|| missing("username"))?;
                let password = password
                    .or(stored_password.as_ref().map(|p| p.expose_secret().as_str()))
                    .ok_or_else(|| missing("password"))?;
                params.push(("username".to_string(), username.to_string()));
                params.push(("password".to_string(), password.to_string()));
            }
            Self::ClientCredentials | Self::Implicit => {}
        }

        Ok(params)
    }
}

fn missing(field: &str) -> OAuthError {
    ConfigurationError::MissingRequired {
        field: field.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_types() {
        assert_eq!(Grant::authorization_code().response_type(), Some("code"));
        assert_eq!(Grant::Implicit.response_type(), Some("token"));
        assert_eq!(Grant::ClientCredentials.response_type(), None);
    }

    #[test]
    fn test_authorization_code_params() {
        let grant = Grant::AuthorizationCode {
            code: Some("stored".to_string()),
        };
        let params = grant.token_request_params(None, None, None).unwrap();
        assert_eq!(
            params,
            vec![
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("code".to_string(), "stored".to_string()),
            ]
        );

        let params = grant.token_request_params(Some("given"), None, None).unwrap();
        assert_eq!(params[1].1, "given");

        assert!(Grant::authorization_code()
            .token_request_params(None, None, None)
            .is_err());
    }

    #[test]
    fn test_password_params() {
        let grant = Grant::password("user", "pass");
        let params = grant.token_request_params(None, None, None).unwrap();
        assert_eq!(params[0].1, "password");
        assert_eq!(params[1], ("username".to_string(), "user".to_string()));
        assert_eq!(params[2], ("password".to_string(), "pass".to_string()));

        let empty = Grant::Password {
            username: None,
            password: None,
        };
        assert!(empty.token_request_params(None, None, None).is_err());
        assert!(empty
            .token_request_params(None, Some("u"), Some("p"))
            .is_ok());
    }

    #[test]
    fn test_client_credentials_params() {
        let params = Grant::ClientCredentials
            .token_request_params(None, None, None)
            .unwrap();
        assert_eq!(
            params,
            vec![("grant_type".to_string(), "client_credentials".to_string())]
        );
    }

    #[test]
    fn test_implicit_has_no_token_request() {
        assert!(matches!(
            Grant::Implicit.token_request_params(None, None, None),
            Err(OAuthError::Configuration(
                ConfigurationError::UnsupportedGrant { .. }
            ))
        ));
    }
}

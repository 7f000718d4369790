//! OAuth2 Client State
//!
//! Grant-aware request preparation and response parsing without I/O.

use std::str::FromStr;
use tracing::warn;

use crate::core::encoding::{
    add_params_to_url, form_urlencode, fragment_params, param, query_params, Params,
    FORM_CONTENT_TYPE,
};
use crate::core::pkce::PkceParams;
use crate::core::transport::{HttpRequest, HttpResponse};
use crate::error::{
    ConfigurationError, OAuthError, ProtocolError, ProviderError, ProviderErrorKind,
    SecurityError, TokenError, TokenRequestDenied,
};
use crate::oauth2::grant::Grant;
use crate::oauth2::token::{now_epoch, Token};

/// Where the access token is attached to protected requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>`.
    #[default]
    Header,
    /// `access_token` query parameter.
    Query,
    /// `access_token` form body parameter.
    Body,
}

impl FromStr for TokenPlacement {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auth_header" | "header" => Ok(Self::Header),
            "query" => Ok(Self::Query),
            "body" => Ok(Self::Body),
            _ => Err(ConfigurationError::InvalidValue {
                field: "token_placement".to_string(),
                message: format!("unknown placement {s}"),
            }
            .into()),
        }
    }
}

/// Parameters recovered from an authorization redirect.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Every parameter of the redirect, in order.
    pub params: Params,
}

/// Client-side OAuth2 state for one grant.
#[derive(Clone, Debug, Default)]
pub struct OAuth2Client {
    client_id: Option<String>,
    grant: Grant,
    token: Token,
    redirect_uri: Option<String>,
    scope: Option<Vec<String>>,
    state: Option<String>,
    placement: TokenPlacement,
    code_verifier: Option<String>,
}

impl OAuth2Client {
    pub fn new(client_id: Option<String>, grant: Grant) -> Self {
        Self {
            client_id,
            grant,
            ..Default::default()
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn set_client_id(&mut self, client_id: Option<String>) {
        self.client_id = client_id;
    }

    pub fn grant(&self) -> &Grant {
        &self.grant
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = token;
    }

    pub fn clear_token(&mut self) {
        self.token = Token::new();
    }

    pub(crate) fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    pub fn set_redirect_uri(&mut self, redirect_uri: Option<String>) {
        self.redirect_uri = redirect_uri;
    }

    pub fn scope(&self) -> Option<&[String]> {
        self.scope.as_deref()
    }

    pub fn set_scope(&mut self, scope: Option<Vec<String>>) {
        self.scope = scope;
    }

    /// Space-separated scope string.
    pub fn scope_string(&self) -> Option<String> {
        self.scope.as_ref().map(|scope| scope.join(" "))
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn set_state(&mut self, state: Option<String>) {
        self.state = state;
    }

    pub fn placement(&self) -> TokenPlacement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: TokenPlacement) {
        self.placement = placement;
    }

    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    /// Build the authorization redirect URL and remember `state`.
    pub fn prepare_authorization_request<K, V>(
        &mut self,
        base_url: &str,
        state: Option<&str>,
        pkce: Option<&PkceParams>,
        extra: &[(K, V)],
    ) -> Result<String, OAuthError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let response_type =
            self.grant
                .response_type()
                .ok_or_else(|| ConfigurationError::UnsupportedGrant {
                    grant: self.grant.name().to_string(),
                    operation: "authorization request".to_string(),
                })?;
        let client_id = self.require_client_id()?.to_string();

        let mut params: Params = vec![
            ("response_type".to_string(), response_type.to_string()),
            ("client_id".to_string(), client_id),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            params.push(("redirect_uri".to_string(), redirect_uri.clone()));
        }
        if let Some(scope) = self.scope_string() {
            params.push(("scope".to_string(), scope));
        }
        if let Some(state) = state {
            params.push(("state".to_string(), state.to_string()));
        }
        if let Some(pkce) = pkce {
            params.push(("code_challenge".to_string(), pkce.code_challenge.clone()));
            params.push((
                "code_challenge_method".to_string(),
                pkce.code_challenge_method.as_str().to_string(),
            ));
            self.code_verifier = Some(pkce.code_verifier.clone());
        }
        params.extend(
            extra
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );

        self.state = state.map(str::to_string);
        Ok(add_params_to_url(base_url, &params))
    }

    /// Parse the redirect the provider sent back to `redirect_uri`.
    ///
    /// The code grant reads the query, the implicit grant reads the fragment
    /// and stores the token it carries.
    pub fn parse_authorization_response(
        &mut self,
        url: &str,
    ) -> Result<AuthorizationResponse, OAuthError> {
        let params = match self.grant {
            Grant::AuthorizationCode { .. } => query_params(url),
            Grant::Implicit => fragment_params(url),
            _ => {
                return Err(ConfigurationError::UnsupportedGrant {
                    grant: self.grant.name().to_string(),
                    operation: "authorization response".to_string(),
                }
                .into())
            }
        };

        if let Some(error) = param(&params, "error") {
            return Err(ProviderError {
                kind: ProviderErrorKind::from_code(error),
                description: param(&params, "error_description").map(str::to_string),
                uri: param(&params, "error_uri").map(str::to_string),
            }
            .into());
        }

        let received = param(&params, "state").map(str::to_string);
        if let Some(expected) = &self.state {
            if received.as_deref() != Some(expected.as_str()) {
                return Err(SecurityError::StateMismatch {
                    expected: expected.clone(),
                    received,
                }
                .into());
            }
        }

        let code = param(&params, "code").map(str::to_string);
        match self.grant {
            Grant::AuthorizationCode { .. } => {
                let code = code.clone().ok_or_else(|| ProtocolError::MissingField {
                    field: "code".to_string(),
                })?;
                self.grant.set_code(Some(code));
            }
            _ => {
                let mut token = Token::from_params(&params);
                if token.access_token().is_none() {
                    return Err(ProtocolError::MissingField {
                        field: "access_token".to_string(),
                    }
                    .into());
                }
                token.remove("state");
                token.stamp_expiry(now_epoch());
                self.token = token;
            }
        }

        Ok(AuthorizationResponse {
            code,
            state: received,
            params,
        })
    }

    /// Body parameters for the token endpoint.
    pub fn prepare_token_request<K, V>(
        &self,
        code: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        include_client_id: bool,
        client_secret: Option<&str>,
        extra: &[(K, V)],
    ) -> Result<Params, OAuthError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = self.grant.token_request_params(code, username, password)?;

        match self.grant {
            Grant::AuthorizationCode { .. } => {
                if let Some(redirect_uri) = &self.redirect_uri {
                    params.push(("redirect_uri".to_string(), redirect_uri.clone()));
                }
                if let Some(verifier) = &self.code_verifier {
                    params.push(("code_verifier".to_string(), verifier.clone()));
                }
            }
            _ => {
                if let Some(scope) = self.scope_string() {
                    params.push(("scope".to_string(), scope));
                }
            }
        }

        if include_client_id {
            params.push(("client_id".to_string(), self.require_client_id()?.to_string()));
            if let Some(secret) = client_secret {
                params.push(("client_secret".to_string(), secret.to_string()));
            }
        }

        merge_params(&mut params, extra);
        Ok(params)
    }

    /// Body parameters for a refresh-token request.
    pub fn prepare_refresh_body<K, V>(&self, refresh_token: &str, extra: &[(K, V)]) -> Params
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];
        if let Some(scope) = self.scope_string() {
            params.push(("scope".to_string(), scope));
        }
        merge_params(&mut params, extra);
        params
    }

    /// Parse a token endpoint response.
    ///
    /// An `error` member wins over the status code; a non-2xx response
    /// without one is a denial.
    pub fn parse_token_response(&self, response: &HttpResponse) -> Result<Token, OAuthError> {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();
        if let Some(error) = parsed
            .as_ref()
            .and_then(|value| value.get("error"))
            .and_then(|error| error.as_str())
        {
            let field = |name: &str| {
                parsed
                    .as_ref()
                    .and_then(|value| value.get(name))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };
            return Err(ProviderError {
                kind: ProviderErrorKind::from_code(error),
                description: field("error_description"),
                uri: field("error_uri"),
            }
            .into());
        }

        if !response.is_success() {
            return Err(TokenRequestDenied::new(response.clone()).into());
        }

        let mut token = Token::from_json(&response.body)?;
        if token.access_token().is_none() {
            return Err(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }
            .into());
        }
        token.stamp_expiry(now_epoch());

        if let (Some(requested), Some(granted)) = (&self.scope, token.scope()) {
            let mut requested = requested.clone();
            let mut granted = granted;
            requested.sort();
            granted.sort();
            if requested != granted {
                warn!(
                    requested = %requested.join(" "),
                    granted = %granted.join(" "),
                    "Scope has changed"
                );
            }
        }

        Ok(token)
    }

    /// Attach the access token to a protected request.
    pub fn add_token(&self, request: &mut HttpRequest) -> Result<(), OAuthError> {
        let access_token = self.token.access_token().ok_or(TokenError::Missing)?;

        if let Some(token_type) = self.token.token_type() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(ConfigurationError::InvalidValue {
                    field: "token_type".to_string(),
                    message: format!("unsupported token type {token_type}"),
                }
                .into());
            }
        }

        if self.token.is_expired() {
            return Err(TokenError::Expired.into());
        }

        match self.placement {
            TokenPlacement::Header => {
                request.set_header("Authorization", format!("Bearer {access_token}"));
            }
            TokenPlacement::Query => {
                request.url = add_params_to_url(&request.url, &[("access_token", access_token)]);
            }
            TokenPlacement::Body => {
                let encoded = form_urlencode(&[("access_token", access_token)]);
                request.body = Some(match request.body.take() {
                    Some(body) if !body.is_empty() => format!("{body}&{encoded}"),
                    _ => encoded,
                });
                if request.header("content-type").is_none() {
                    request.set_header("Content-Type", FORM_CONTENT_TYPE);
                }
            }
        }
        Ok(())
    }

    fn require_client_id(&self) -> Result<&str, OAuthError> {
        self.client_id.as_deref().ok_or_else(|| {
            ConfigurationError::MissingRequired {
                field: "client_id".to_string(),
            }
            .into()
        })
    }
}

/// Append extra parameters, replacing values of keys already present.
fn merge_params<K, V>(params: &mut Params, extra: &[(K, V)])
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in extra {
        let (key, value) = (key.as_ref(), value.as_ref());
        match params.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.to_string(),
            None => params.push((key.to_string(), value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pkce::{compute_challenge, PkceMethod};
    use crate::core::transport::HttpMethod;
    use serde_json::json;

    const NO_EXTRA: &[(&str, &str)] = &[];

    fn client(grant: Grant) -> OAuth2Client {
        let mut client = OAuth2Client::new(Some("foo".to_string()), grant);
        client.set_redirect_uri(Some("https://i.b/callback".to_string()));
        client
    }

    fn bearer(access_token: &str) -> Token {
        let mut token = Token::new();
        token.set_access_token(access_token);
        token.insert("token_type", "Bearer");
        token
    }

    #[test]
    fn test_authorization_url_params() {
        let mut client = client(Grant::authorization_code());
        client.set_scope(Some(vec!["read".to_string(), "write".to_string()]));

        let url = client
            .prepare_authorization_request(
                "https://i.b/authorize",
                Some("xyz"),
                None,
                &[("access_type", "offline")],
            )
            .unwrap();

        assert_eq!(
            url,
            "https://i.b/authorize?response_type=code&client_id=foo\
             &redirect_uri=https%3A%2F%2Fi.b%2Fcallback&scope=read%20write&state=xyz\
             &access_type=offline"
        );
        assert_eq!(client.state(), Some("xyz"));
    }

    #[test]
    fn test_implicit_authorization_url() {
        let mut client = client(Grant::Implicit);
        let url = client
            .prepare_authorization_request("https://i.b/authorize", None, None, NO_EXTRA)
            .unwrap();
        assert!(url.contains("response_type=token"));
        assert!(!url.contains("state="));
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        let mut client = OAuth2Client::new(None, Grant::authorization_code());
        assert!(matches!(
            client.prepare_authorization_request("https://i.b", None, None, NO_EXTRA),
            Err(OAuthError::Configuration(
                ConfigurationError::MissingRequired { .. }
            ))
        ));
    }

    #[test]
    fn test_authorization_url_with_pkce() {
        let mut client = client(Grant::authorization_code());
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let pkce = PkceParams {
            code_verifier: verifier.to_string(),
            code_challenge: compute_challenge(verifier, PkceMethod::S256),
            code_challenge_method: PkceMethod::S256,
        };
        let url = client
            .prepare_authorization_request("https://i.b", Some("s"), Some(&pkce), NO_EXTRA)
            .unwrap();

        assert!(url.contains("code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"));
        assert!(url.contains("code_challenge_method=S256"));

        let body = client
            .prepare_token_request(Some("c"), None, None, false, None, NO_EXTRA)
            .unwrap();
        assert_eq!(param(&body, "code_verifier"), Some(verifier));
    }

    #[test]
    fn test_code_response_round_trip() {
        let mut client = client(Grant::authorization_code());
        let url = client
            .prepare_authorization_request("https://i.b/authorize", Some("xyz"), None, NO_EXTRA)
            .unwrap();
        let sent_state = param(&query_params(&url), "state").map(str::to_string);

        let response = client
            .parse_authorization_response("https://i.b/callback?code=abc&state=xyz")
            .unwrap();

        assert_eq!(response.code.as_deref(), Some("abc"));
        assert_eq!(response.state, sent_state);
        assert_eq!(client.grant().code(), Some("abc"));
    }

    #[test]
    fn test_state_mismatch_is_rejected() {
        for grant in [Grant::authorization_code(), Grant::Implicit] {
            let mut client = client(grant);
            client.set_state(Some("expected".to_string()));

            let result = client.parse_authorization_response(
                "https://i.b/callback?code=abc&state=forged#access_token=t&state=forged",
            );
            assert!(matches!(
                result,
                Err(OAuthError::Security(SecurityError::StateMismatch { .. }))
            ));
        }
    }

    #[test]
    fn test_missing_state_is_rejected_when_expected() {
        let mut client = client(Grant::authorization_code());
        client.set_state(Some("expected".to_string()));
        assert!(client
            .parse_authorization_response("https://i.b/callback?code=abc")
            .is_err());
    }

    #[test]
    fn test_stateless_mode_accepts_any_state() {
        let mut client = client(Grant::authorization_code());
        assert!(client
            .parse_authorization_response("https://i.b/callback?code=abc&state=anything")
            .is_ok());
    }

    #[test]
    fn test_error_redirect() {
        let mut client = client(Grant::authorization_code());
        let result = client.parse_authorization_response(
            "https://i.b/callback?error=access_denied&error_description=nope",
        );
        match result {
            Err(OAuthError::Provider(error)) => {
                assert_eq!(error.kind, ProviderErrorKind::AccessDenied);
                assert_eq!(error.description.as_deref(), Some("nope"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_implicit_fragment_token() {
        let mut client = client(Grant::Implicit);
        client.set_state(Some("xyz".to_string()));
        let before = now_epoch();

        client
            .parse_authorization_response(
                "https://i.b/callback#access_token=2YotnFZFEjr1zCsicMWpAA\
                 &token_type=Bearer&expires_in=3600&state=xyz",
            )
            .unwrap();

        let token = client.token();
        assert_eq!(token.access_token(), Some("2YotnFZFEjr1zCsicMWpAA"));
        let expires_at = token.expires_at().unwrap();
        assert!(expires_at >= (before + 3600) as f64);
        assert!(expires_at <= (now_epoch() + 3600) as f64);
    }

    #[test]
    fn test_prepare_token_request_variants() {
        let client_id = client(Grant::authorization_code());
        let body = client_id
            .prepare_token_request(Some("abc"), None, None, true, Some("secret"), NO_EXTRA)
            .unwrap();
        assert_eq!(
            body,
            vec![
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("code".to_string(), "abc".to_string()),
                ("redirect_uri".to_string(), "https://i.b/callback".to_string()),
                ("client_id".to_string(), "foo".to_string()),
                ("client_secret".to_string(), "secret".to_string()),
            ]
        );

        let mut backend = client(Grant::ClientCredentials);
        backend.set_scope(Some(vec!["a".to_string()]));
        let body = backend
            .prepare_token_request(None, None, None, false, None, &[("audience", "api")])
            .unwrap();
        assert_eq!(param(&body, "scope"), Some("a"));
        assert_eq!(param(&body, "audience"), Some("api"));
        assert_eq!(param(&body, "client_id"), None);
    }

    #[test]
    fn test_prepare_refresh_body() {
        let mut client = client(Grant::authorization_code());
        client.set_scope(Some(vec!["read".to_string()]));
        let body = client.prepare_refresh_body("r", &[("client_id", "foo")]);
        assert_eq!(
            body,
            vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                ("refresh_token".to_string(), "r".to_string()),
                ("scope".to_string(), "read".to_string()),
                ("client_id".to_string(), "foo".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_token_response() {
        let client = client(Grant::authorization_code());
        let before = now_epoch();
        let token = client
            .parse_token_response(&HttpResponse::json(
                200,
                &json!({"access_token": "foo", "expires_in": 3600}),
            ))
            .unwrap();
        assert_eq!(token.access_token(), Some("foo"));
        let expires_at = token.expires_at().unwrap();
        assert!(expires_at >= (before + 3600) as f64);
    }

    #[test]
    fn test_error_field_wins_over_status() {
        let client = client(Grant::authorization_code());
        for status in [200, 400] {
            let result = client.parse_token_response(&HttpResponse::json(
                status,
                &json!({"error": "invalid_grant"}),
            ));
            assert!(matches!(
                result,
                Err(OAuthError::Provider(ProviderError {
                    kind: ProviderErrorKind::InvalidGrant,
                    ..
                }))
            ));
        }
    }

    #[test]
    fn test_denial_and_parse_errors() {
        let client = client(Grant::authorization_code());

        let denied = client.parse_token_response(&HttpResponse::new(503, "unavailable"));
        assert_eq!(denied.unwrap_err().status_code(), Some(503));

        let not_json = client.parse_token_response(&HttpResponse::new(200, "access_token=foo"));
        assert!(matches!(
            not_json,
            Err(OAuthError::Protocol(ProtocolError::InvalidJson { .. }))
        ));

        let no_token = client.parse_token_response(&HttpResponse::json(200, &json!({"a": 1})));
        assert!(matches!(
            no_token,
            Err(OAuthError::Protocol(ProtocolError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_add_token_placements() {
        let mut client = client(Grant::authorization_code());
        client.set_token(bearer("abc"));

        let mut request = HttpRequest::get("https://i.b/api?x=1");
        client.add_token(&mut request).unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer abc"));

        client.set_placement(TokenPlacement::Query);
        let mut request = HttpRequest::get("https://i.b/api?x=1");
        client.add_token(&mut request).unwrap();
        assert_eq!(request.url, "https://i.b/api?x=1&access_token=abc");

        client.set_placement(TokenPlacement::Body);
        let mut request = HttpRequest::new(HttpMethod::Post, "https://i.b/api").with_body("a=b");
        client.add_token(&mut request).unwrap();
        assert_eq!(request.body.as_deref(), Some("a=b&access_token=abc"));
        assert_eq!(request.content_type().as_deref(), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn test_add_token_errors() {
        let mut client = client(Grant::authorization_code());
        let mut request = HttpRequest::get("https://i.b/api");
        assert!(matches!(
            client.add_token(&mut request),
            Err(OAuthError::Token(TokenError::Missing))
        ));

        let mut expired = bearer("abc");
        expired.insert("expires_at", now_epoch() - 10);
        client.set_token(expired);
        assert!(matches!(
            client.add_token(&mut request),
            Err(OAuthError::Token(TokenError::Expired))
        ));

        let mut mac = bearer("abc");
        mac.insert("token_type", "mac");
        client.set_token(mac);
        assert!(matches!(
            client.add_token(&mut request),
            Err(OAuthError::Configuration(ConfigurationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_placement_from_str() {
        assert_eq!("QUERY".parse::<TokenPlacement>().unwrap(), TokenPlacement::Query);
        assert_eq!(
            "auth_header".parse::<TokenPlacement>().unwrap(),
            TokenPlacement::Header
        );
        assert!("cookie".parse::<TokenPlacement>().is_err());
    }
}

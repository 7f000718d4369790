//! Compliance Hooks
//!
//! Per-session hook registry used to normalize providers that deviate from
//! RFC 6749. Hooks run in registration order at five fixed points and the
//! pipeline performs no validation of what they return.

pub mod fixes;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::transport::{HttpRequest, HttpResponse};
use crate::error::{ConfigurationError, OAuthError};

/// Hook point in the token lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    AccessTokenRequest,
    AccessTokenResponse,
    RefreshTokenRequest,
    RefreshTokenResponse,
    ProtectedRequest,
}

/// Whether a hook point sees requests or responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    Request,
    Response,
}

impl HookPoint {
    pub const ALL: [HookPoint; 5] = [
        Self::AccessTokenRequest,
        Self::AccessTokenResponse,
        Self::RefreshTokenRequest,
        Self::RefreshTokenResponse,
        Self::ProtectedRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessTokenRequest => "access_token_request",
            Self::AccessTokenResponse => "access_token_response",
            Self::RefreshTokenRequest => "refresh_token_request",
            Self::RefreshTokenResponse => "refresh_token_response",
            Self::ProtectedRequest => "protected_request",
        }
    }

    pub fn kind(&self) -> HookKind {
        match self {
            Self::AccessTokenResponse | Self::RefreshTokenResponse => HookKind::Response,
            _ => HookKind::Request,
        }
    }
}

impl FromStr for HookPoint {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|point| point.as_str() == s)
            .ok_or_else(|| {
                ConfigurationError::InvalidHookPoint {
                    name: s.to_string(),
                }
                .into()
            })
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-side hook points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestHookPoint {
    AccessToken,
    RefreshToken,
    Protected,
}

/// Response-side hook points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseHookPoint {
    AccessToken,
    RefreshToken,
}

impl From<RequestHookPoint> for HookPoint {
    fn from(point: RequestHookPoint) -> Self {
        match point {
            RequestHookPoint::AccessToken => Self::AccessTokenRequest,
            RequestHookPoint::RefreshToken => Self::RefreshTokenRequest,
            RequestHookPoint::Protected => Self::ProtectedRequest,
        }
    }
}

impl From<ResponseHookPoint> for HookPoint {
    fn from(point: ResponseHookPoint) -> Self {
        match point {
            ResponseHookPoint::AccessToken => Self::AccessTokenResponse,
            ResponseHookPoint::RefreshToken => Self::RefreshTokenResponse,
        }
    }
}

/// The `(url, headers, body)` triple seen by request hooks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestParts {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl RequestParts {
    pub fn from_request(request: &HttpRequest) -> Self {
        Self {
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }

    /// Write the parts back onto `request`.
    pub fn apply_to(self, request: &mut HttpRequest) {
        request.url = self.url;
        request.headers = self.headers;
        request.body = self.body;
    }

    /// Set a header, replacing any header with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }
}

/// Session values made available to request hooks.
#[derive(Clone, Debug, Default)]
pub struct HookContext {
    pub client_id: Option<String>,
    pub access_token: Option<String>,
}

pub type RequestHook = Arc<dyn Fn(RequestParts, &HookContext) -> RequestParts + Send + Sync>;
pub type ResponseHook = Arc<dyn Fn(HttpResponse) -> HttpResponse + Send + Sync>;

/// A hook of either kind.
#[derive(Clone)]
pub enum ComplianceHook {
    Request(RequestHook),
    Response(ResponseHook),
}

impl ComplianceHook {
    pub fn kind(&self) -> HookKind {
        match self {
            Self::Request(_) => HookKind::Request,
            Self::Response(_) => HookKind::Response,
        }
    }
}

/// Ordered hook lists keyed by hook point.
#[derive(Clone, Default)]
pub struct ComplianceHooks {
    hooks: HashMap<HookPoint, Vec<ComplianceHook>>,
}

impl ComplianceHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook; its kind must match the point.
    pub fn register(&mut self, point: HookPoint, hook: ComplianceHook) -> Result<(), OAuthError> {
        if hook.kind() != point.kind() {
            return Err(ConfigurationError::HookKindMismatch {
                point: point.as_str().to_string(),
            }
            .into());
        }
        self.hooks.entry(point).or_default().push(hook);
        Ok(())
    }

    /// Register a hook by point name, e.g. `"protected_request"`.
    pub fn register_named(&mut self, name: &str, hook: ComplianceHook) -> Result<(), OAuthError> {
        self.register(name.parse()?, hook)
    }

    pub fn register_request<F>(&mut self, point: RequestHookPoint, hook: F)
    where
        F: Fn(RequestParts, &HookContext) -> RequestParts + Send + Sync + 'static,
    {
        self.hooks
            .entry(point.into())
            .or_default()
            .push(ComplianceHook::Request(Arc::new(hook)));
    }

    pub fn register_response<F>(&mut self, point: ResponseHookPoint, hook: F)
    where
        F: Fn(HttpResponse) -> HttpResponse + Send + Sync + 'static,
    {
        self.hooks
            .entry(point.into())
            .or_default()
            .push(ComplianceHook::Response(Arc::new(hook)));
    }

    /// Number of hooks registered at a point.
    pub fn count(&self, point: HookPoint) -> usize {
        self.hooks.get(&point).map_or(0, Vec::len)
    }

    /// Run the request hooks of a point over `parts`.
    pub fn apply_request(
        &self,
        point: RequestHookPoint,
        parts: RequestParts,
        context: &HookContext,
    ) -> RequestParts {
        let point = HookPoint::from(point);
        let hooks = self.hooks.get(&point).map(Vec::as_slice).unwrap_or_default();
        if !hooks.is_empty() {
            tracing::debug!(point = %point, count = hooks.len(), "Invoking compliance hooks");
        }
        hooks.iter().fold(parts, |parts, hook| match hook {
            ComplianceHook::Request(hook) => hook(parts, context),
            ComplianceHook::Response(_) => parts,
        })
    }

    /// Run the response hooks of a point over `response`.
    pub fn apply_response(&self, point: ResponseHookPoint, response: HttpResponse) -> HttpResponse {
        let point = HookPoint::from(point);
        let hooks = self.hooks.get(&point).map(Vec::as_slice).unwrap_or_default();
        if !hooks.is_empty() {
            tracing::debug!(point = %point, count = hooks.len(), "Invoking compliance hooks");
        }
        hooks.iter().fold(response, |response, hook| match hook {
            ComplianceHook::Response(hook) => hook(response),
            ComplianceHook::Request(_) => response,
        })
    }

    /// Apply request hooks to a full request in place.
    pub(crate) fn apply_to_request(
        &self,
        point: RequestHookPoint,
        request: &mut HttpRequest,
        context: &HookContext,
    ) {
        if self.count(point.into()) == 0 {
            return;
        }
        let parts = self.apply_request(point, RequestParts::from_request(request), context);
        parts.apply_to(request);
    }
}

impl fmt::Debug for ComplianceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for point in HookPoint::ALL {
            let count = self.count(point);
            if count > 0 {
                map.entry(&point.as_str(), &count);
            }
        }
        map.finish()
    }
}

/// Rewrite a JSON object body, leaving other bodies untouched.
pub fn rewrite_json_body<F>(mut response: HttpResponse, rewrite: F) -> HttpResponse
where
    F: FnOnce(&mut Map<String, Value>),
{
    if let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(&response.body) {
        rewrite(&mut map);
        response.body = Value::Object(map).to_string();
    }
    response
}

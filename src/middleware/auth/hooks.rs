//! Terminal hooks and the bypass filter.
//!
//! Each request ends in exactly one hook: success, error or none-auth. Hooks are plain trait
//! objects injected through `AuthConfigBuilder`; closures work via the blanket impls.

use std::{future::Future, pin::Pin};

use axum::extract::{OriginalUri, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::AuthError;

pub type HookFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Returns `true` when authentication should be skipped for the request.
pub trait RequestFilter: Send + Sync {
    fn skip(&self, req: &Request) -> bool;
}

impl<F> RequestFilter for F
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    fn skip(&self, req: &Request) -> bool {
        self(req)
    }
}

/// Runs after an `AuthContext` was published into the request extensions.
pub trait SuccessHook: Send + Sync {
    fn on_success(&self, req: Request, next: Next) -> HookFuture;
}

impl<F, Fut> SuccessHook for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn on_success(&self, req: Request, next: Next) -> HookFuture {
        Box::pin(self(req, next))
    }
}

pub trait ErrorHook: Send + Sync {
    fn on_error(&self, req: &Request, err: AuthError) -> Response;
}

impl<F> ErrorHook for F
where
    F: Fn(&Request, AuthError) -> Response + Send + Sync,
{
    fn on_error(&self, req: &Request, err: AuthError) -> Response {
        self(req, err)
    }
}

/// Handles requests that carry no `Authorization` header at all.
pub trait NoneAuthHook: Send + Sync {
    fn on_none(&self, req: Request, next: Next, on_error: &dyn ErrorHook) -> HookFuture;
}

/// Default success hook: hand the request to the inner service.
#[derive(Debug, Clone, Copy, Default)]
pub struct Continue;

impl SuccessHook for Continue {
    fn on_success(&self, req: Request, next: Next) -> HookFuture {
        Box::pin(next.run(req))
    }
}

/// Default error hook: 401 with the error message as a plain-text body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unauthorized;

impl ErrorHook for Unauthorized {
    fn on_error(&self, _req: &Request, err: AuthError) -> Response {
        (StatusCode::UNAUTHORIZED, err.to_string()).into_response()
    }
}

/// Default none-auth hook: treated as an error ("authenticate is none").
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyNoneAuth;

impl NoneAuthHook for DenyNoneAuth {
    fn on_none(&self, req: Request, _next: Next, on_error: &dyn ErrorHook) -> HookFuture {
        let response = on_error.on_error(&req, AuthError::MissingAuthorization);
        Box::pin(async move { response })
    }
}

/// Lets requests without credentials through, without an `AuthContext`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnonymous;

impl NoneAuthHook for AllowAnonymous {
    fn on_none(&self, req: Request, next: Next, _on_error: &dyn ErrorHook) -> HookFuture {
        Box::pin(next.run(req))
    }
}

/// Bypass filter over the request path.
///
/// `"/ping"` matches exactly, `"/validate*"` matches every path starting with `/validate`.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PathFilter {
    pub fn parse(spec: &str) -> Self {
        let mut filter = Self::default();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.strip_suffix('*') {
                Some(prefix) => filter.prefixes.push(prefix.to_string()),
                None => filter.exact.push(entry.to_string()),
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p))
    }
}

impl RequestFilter for PathFilter {
    fn skip(&self, req: &Request) -> bool {
        // Nested routers may see a stripped URI; match against what the client sent.
        let path = match req.extensions().get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path(),
            None => req.uri().path(),
        };
        self.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_filter_matches_exact_and_prefix_entries() {
        let filter = PathFilter::parse("/ping, /health ,/validate*");
        assert!(filter.matches("/ping"));
        assert!(filter.matches("/health"));
        assert!(filter.matches("/validate"));
        assert!(filter.matches("/validate/extra"));
        assert!(!filter.matches("/ping/more"));
        assert!(!filter.matches("/key"));
    }

    #[test]
    fn empty_spec_matches_nothing() {
        let filter = PathFilter::parse(" , ");
        assert!(filter.is_empty());
        assert!(!filter.matches("/"));
    }
}

//! Request authentication pass (filter → classify → allow-list → extract → verify → hook).
//!
//! Exactly one terminal path is taken per request:
//! - bypass filter matched: inner service, nothing published
//! - no `Authorization` header: none-auth hook
//! - scheme not allow-listed, extraction failure, verification failure: error hook
//! - verified: `AuthContext` published into extensions, then success hook

use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::header,
    middleware::{self, Next},
    response::Response,
};

use super::config::AuthConfig;
use super::error::AuthError;
use super::lookup::LookupContext;
use super::result::AuthContext;
use super::schema::AuthSchema;

/// Layer the authentication middleware onto every route of `router`.
///
/// 例：
/// ```ignore
/// let auth = Arc::new(AuthConfig::builder().build()?);
/// let router = middleware::auth::apply(api::v1::routes(), auth);
/// ```
pub fn apply<S>(router: Router<S>, config: Arc<AuthConfig>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(config, authenticate))
}

pub async fn authenticate(
    State(config): State<Arc<AuthConfig>>,
    req: Request,
    next: Next,
) -> Response {
    if config.filter().is_some_and(|f| f.skip(&req)) {
        tracing::trace!(path = %req.uri().path(), "authentication bypassed");
        return next.run(req).await;
    }

    let schema = AuthSchema::classify(req.headers().get(header::AUTHORIZATION));

    if schema == AuthSchema::None {
        tracing::debug!(path = %req.uri().path(), "no authorization header");
        return config
            .none_auth_hook()
            .on_none(req, next, config.error_hook())
            .await;
    }

    if !config.is_allowed(schema) {
        return reject(&config, &req, schema, AuthError::PolicyViolation(schema));
    }

    // Path parameters are only present when the middleware runs behind the router.
    let (mut parts, body) = req.into_parts();
    let params = RawPathParams::from_request_parts(&mut parts, &()).await.ok();
    let extracted = config
        .extractors()
        .run(&LookupContext::new(&parts, params.as_ref()), schema);
    drop(params);
    let mut req = Request::from_parts(parts, body);

    let credential = match extracted {
        Ok(credential) => credential,
        Err(err) => return reject(&config, &req, schema, err),
    };

    let Some(verifier) = config.verifier(schema) else {
        return reject(&config, &req, schema, AuthError::PolicyViolation(schema));
    };

    // passwd/PAM lookups and signature checks block; keep them off the async workers.
    let outcome = tokio::task::spawn_blocking(move || verifier.verify(&credential))
        .await
        .unwrap_or_else(|e| Err(AuthError::VerificationBackend(e.to_string())));

    match outcome {
        Ok(result) => {
            tracing::debug!(
                schema = %schema,
                username = result.username().unwrap_or_default(),
                "request authenticated"
            );
            req.extensions_mut()
                .insert(AuthContext::new(config.context_key(), result));
            config.success_hook().on_success(req, next).await
        }
        Err(err) => reject(&config, &req, schema, err),
    }
}

fn reject(config: &AuthConfig, req: &Request, schema: AuthSchema, err: AuthError) -> Response {
    tracing::warn!(
        schema = %schema,
        kind = err.kind(),
        error = %err,
        path = %req.uri().path(),
        "authentication rejected"
    );
    config.error_hook().on_error(req, err)
}

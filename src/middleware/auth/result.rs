/*
 * Responsibility
 * - 認証結果の型 (AuthResult) と handler 向け extractor
 * - middleware が request extensions に AuthContext を格納し、handler はこの型だけを受け取る
 */
use std::convert::Infallible;
use std::path::PathBuf;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Host account resolved for a Basic credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub username: String,
    pub home_dir: PathBuf,
}

/// Verified token payload, kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    Basic(Identity),
    Bearer(Claims),
}

impl AuthResult {
    /// Basic: the account name. Bearer: the `username` claim, falling back to `sub`.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic(identity) => Some(identity.username.as_str()),
            Self::Bearer(claims) => claims.get_str("username").or_else(|| claims.subject()),
        }
    }
}

/// What the middleware publishes into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    key: String,
    result: AuthResult,
}

impl AuthContext {
    pub(crate) fn new(key: impl Into<String>, result: AuthResult) -> Self {
        Self {
            key: key.into(),
            result,
        }
    }

    /// Context key configured on the middleware that produced this result.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn result(&self) -> &AuthResult {
        &self.result
    }

    pub fn into_result(self) -> AuthResult {
        self.result
    }
}

/// Handler extractor for routes that require authentication.
/// 見つからない場合は 401 を返す（ミドルウェア未設定・bypass 対象）
pub struct Authenticated(pub AuthContext);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Authenticated)
            .ok_or(AppError::Unauthorized)
    }
}

/// Same as `Authenticated` but never rejects (bypassed or anonymous requests).
pub struct MaybeAuthenticated(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for MaybeAuthenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthenticated(parts.extensions.get::<AuthContext>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => Claims::new(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn username_prefers_claim_over_subject() {
        let result = AuthResult::Bearer(claims(json!({"sub": "AccessToken", "username": "alice"})));
        assert_eq!(result.username(), Some("alice"));

        let result = AuthResult::Bearer(claims(json!({"sub": "bob"})));
        assert_eq!(result.username(), Some("bob"));
    }

    #[test]
    fn basic_username_is_account_name() {
        let result = AuthResult::Basic(Identity {
            uid: 1000,
            gid: 1000,
            username: "alice".into(),
            home_dir: "/home/alice".into(),
        });
        assert_eq!(result.username(), Some("alice"));
    }
}

//! Error kinds surfaced by the authentication middleware.
//!
//! Every failure ends up in exactly one `AuthError`; the error hook decides how it is rendered.
//! `Display` output is what the default hook sends back as the response body.

use std::fmt;

use thiserror::Error;

use super::schema::AuthSchema;

/// Why a syntactically valid credential was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Password backend did not report success (including backend errors).
    BadPassword,
    BadSignature,
    /// Token was signed with another algorithm than the configured one.
    AlgorithmMismatch,
    Expired,
    NotYetValid,
    /// A required claim (sub/iss/aud/...) is missing or does not match.
    Claim(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPassword => write!(f, "invalid username or password"),
            Self::BadSignature => write!(f, "token signature is invalid"),
            Self::AlgorithmMismatch => write!(f, "token algorithm is not accepted"),
            Self::Expired => write!(f, "token is expired"),
            Self::NotYetValid => write!(f, "token is not valid yet"),
            Self::Claim(detail) => write!(f, "token claim rejected: {}", detail),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header at all. Only reaches the error hook through the
    /// default none-auth hook.
    #[error("authenticate is none")]
    MissingAuthorization,

    /// No configured source yielded a credential.
    #[error("missing or malformed auth info")]
    ExtractionFailure,

    #[error("AuthSchema:{0} not allowed")]
    PolicyViolation(AuthSchema),

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("user:{0} not found")]
    IdentityNotFound(String),

    #[error("{0}")]
    InvalidCredentials(Rejection),

    #[error("verification backend error: {0}")]
    VerificationBackend(String),
}

impl AuthError {
    /// Stable machine-readable name of the error kind (for logs and custom error hooks).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAuthorization => "missing_authorization",
            Self::ExtractionFailure => "extraction_failure",
            Self::PolicyViolation(_) => "policy_violation",
            Self::MalformedCredential(_) => "malformed_credential",
            Self::IdentityNotFound(_) => "identity_not_found",
            Self::InvalidCredentials(_) => "invalid_credentials",
            Self::VerificationBackend(_) => "verification_backend_error",
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::InvalidCredentials(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Errors raised while building an `AuthConfig`.
#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("invalid token lookup entry '{0}' (expected <source>:<name>)")]
    InvalidLookup(String),

    #[error("unknown token lookup source '{0}' (expected header, query, param or cookie)")]
    UnknownSource(String),

    #[error("unknown auth schema '{0}'")]
    UnknownSchema(String),

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid signature algorithm '{0}'")]
    InvalidAlgorithm(String),

    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),
}

//! Basic scheme: `base64(username:password)` checked against the host account database and a
//! password authentication backend (PAM).

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use uzers::os::unix::UserExt;

use crate::middleware::auth::error::{AuthError, Rejection};
use crate::middleware::auth::result::Identity;

/// Source of truth mapping a username to an account record.
pub trait IdentityStore: Send + Sync {
    fn lookup(&self, username: &str) -> Option<Identity>;
}

/// Result reported by a password backend. Only `Accepted` lets a request through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Accepted,
    Rejected,
}

#[derive(Debug, Error)]
pub enum AuthenticatorError {
    #[error("password authentication is not available in this build")]
    Unavailable,
    #[error("password backend failure: {0}")]
    Backend(String),
}

pub trait PasswordAuthenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str)
    -> Result<PasswordCheck, AuthenticatorError>;
}

/// Accounts from the host passwd database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentityStore;

impl IdentityStore for SystemIdentityStore {
    fn lookup(&self, username: &str) -> Option<Identity> {
        let user = uzers::get_user_by_name(username)?;
        Some(Identity {
            uid: user.uid(),
            gid: user.primary_group_id(),
            username: user.name().to_string_lossy().into_owned(),
            home_dir: user.home_dir().to_path_buf(),
        })
    }
}

/// Installed when the crate is built without the `pam` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAuthenticator;

impl PasswordAuthenticator for UnavailableAuthenticator {
    fn authenticate(&self, _: &str, _: &str) -> Result<PasswordCheck, AuthenticatorError> {
        Err(AuthenticatorError::Unavailable)
    }
}

#[cfg(feature = "pam")]
#[derive(Debug, Clone)]
pub struct PamAuthenticator {
    service: String,
}

#[cfg(feature = "pam")]
impl PamAuthenticator {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[cfg(feature = "pam")]
impl PasswordAuthenticator for PamAuthenticator {
    fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<PasswordCheck, AuthenticatorError> {
        let mut auth = pam::Authenticator::with_password(&self.service)
            .map_err(|e| AuthenticatorError::Backend(e.to_string()))?;
        auth.get_handler().set_credentials(username, password);
        match auth.authenticate() {
            Ok(()) => Ok(PasswordCheck::Accepted),
            Err(e) => {
                tracing::debug!(service = %self.service, error = %e, "pam authentication failed");
                Ok(PasswordCheck::Rejected)
            }
        }
    }
}

/// Split a base64 `username:password` payload. The first colon separates the two halves.
pub fn parse_basic_credential(raw: &str) -> Result<(String, String), AuthError> {
    let decoded = STANDARD
        .decode(raw.trim())
        .map_err(|e| AuthError::MalformedCredential(format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AuthError::MalformedCredential("credential is not valid UTF-8".into()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::MalformedCredential("missing ':' separator".into()))?;
    Ok((username.to_string(), password.to_string()))
}

#[derive(Clone)]
pub struct BasicVerifier {
    identities: Arc<dyn IdentityStore>,
    authenticator: Arc<dyn PasswordAuthenticator>,
}

impl fmt::Debug for BasicVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicVerifier").finish_non_exhaustive()
    }
}

impl BasicVerifier {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        authenticator: Arc<dyn PasswordAuthenticator>,
    ) -> Self {
        Self {
            identities,
            authenticator,
        }
    }

    pub fn verify(&self, raw: &str) -> Result<Identity, AuthError> {
        let (username, password) = parse_basic_credential(raw)?;

        let identity = self
            .identities
            .lookup(&username)
            .ok_or_else(|| AuthError::IdentityNotFound(username.clone()))?;

        match self.authenticator.authenticate(&username, &password) {
            Ok(PasswordCheck::Accepted) => Ok(identity),
            Ok(PasswordCheck::Rejected) => Err(AuthError::InvalidCredentials(Rejection::BadPassword)),
            Err(err) => {
                tracing::warn!(error = %err, username = %username, "password backend error");
                Err(AuthError::InvalidCredentials(Rejection::BadPassword))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FixedPassword, StaticIdentities};
    use super::*;

    fn encode(s: &str) -> String {
        STANDARD.encode(s)
    }

    fn verifier(auth: Arc<FixedPassword>) -> BasicVerifier {
        BasicVerifier::new(Arc::new(StaticIdentities::with(&["alice"])), auth)
    }

    #[test]
    fn first_colon_splits_username_and_password() {
        let (user, pass) = parse_basic_credential(&encode("alice:won:der:land")).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "won:der:land");
    }

    #[test]
    fn rejects_undecodable_or_separatorless_payloads() {
        assert!(matches!(
            parse_basic_credential("%%%not-base64"),
            Err(AuthError::MalformedCredential(_))
        ));
        assert!(matches!(
            parse_basic_credential(&encode("alice")),
            Err(AuthError::MalformedCredential(_))
        ));
    }

    #[test]
    fn accepts_known_user_with_valid_password() {
        let auth = Arc::new(FixedPassword::new("wonderland"));
        let identity = verifier(auth.clone())
            .verify(&encode("alice:wonderland"))
            .unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.uid, 1000);
        assert_eq!(auth.calls(), 1);
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let auth = Arc::new(FixedPassword::new("wonderland"));
        let err = verifier(auth).verify(&encode("alice:looking-glass")).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::BadPassword));
    }

    #[test]
    fn unknown_user_skips_password_backend() {
        let auth = Arc::new(FixedPassword::new("wonderland"));
        let err = verifier(auth.clone())
            .verify(&encode("mallory:wonderland"))
            .unwrap_err();
        assert!(matches!(err, AuthError::IdentityNotFound(ref name) if name == "mallory"));
        assert_eq!(auth.calls(), 0);
    }

    #[test]
    fn backend_errors_count_as_invalid_credentials() {
        let verifier = BasicVerifier::new(
            Arc::new(StaticIdentities::with(&["alice"])),
            Arc::new(UnavailableAuthenticator),
        );
        let err = verifier.verify(&encode("alice:wonderland")).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(Rejection::BadPassword)));
    }
}

//! Scheme-specific credential verification.
//!
//! One verifier per recognized scheme behind a closed enum. Adding a scheme means adding a
//! variant here (and in `AuthSchema`).

pub mod basic;
pub mod bearer;

pub use basic::{
    BasicVerifier, IdentityStore, PasswordAuthenticator, PasswordCheck, SystemIdentityStore,
    UnavailableAuthenticator,
};
#[cfg(feature = "pam")]
pub use basic::PamAuthenticator;
pub use bearer::{BearerVerifier, SigningKey, TokenConstraints};

use super::error::AuthError;
use super::result::AuthResult;

#[derive(Debug, Clone)]
pub enum Verifier {
    Basic(BasicVerifier),
    Bearer(BearerVerifier),
}

impl Verifier {
    /// Verify a raw credential. Blocking (passwd/PAM access, signature checks).
    pub fn verify(&self, raw: &str) -> Result<AuthResult, AuthError> {
        match self {
            Self::Basic(v) => v.verify(raw).map(AuthResult::Basic),
            Self::Bearer(v) => v.verify(raw).map(AuthResult::Bearer),
        }
    }
}

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::middleware::auth::error::{AuthConfigError, AuthError, Rejection};
use crate::middleware::auth::result::Claims;

/// Key material used to check token signatures.
#[derive(Clone)]
pub enum SigningKey {
    /// Shared secret for the HS* family.
    Secret(Vec<u8>),
    /// PEM public key for RS*/PS*/ES*/EdDSA.
    Pem(String),
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        match self {
            Self::Secret(_) => f.write_str("SigningKey::Secret([REDACTED])"),
            Self::Pem(_) => f.write_str("SigningKey::Pem([REDACTED])"),
        }
    }
}

impl SigningKey {
    fn decoding_key(&self, algorithm: Algorithm) -> Result<DecodingKey, AuthConfigError> {
        use Algorithm::*;

        let invalid = |e: jsonwebtoken::errors::Error| AuthConfigError::InvalidSigningKey(e.to_string());
        match (algorithm, self) {
            (HS256 | HS384 | HS512, Self::Secret(secret)) => Ok(DecodingKey::from_secret(secret)),
            (HS256 | HS384 | HS512, Self::Pem(_)) => Err(AuthConfigError::InvalidSigningKey(
                "HMAC algorithms need a shared secret, not a PEM key".into(),
            )),
            (_, Self::Secret(_)) => Err(AuthConfigError::InvalidSigningKey(format!(
                "{:?} needs a PEM public key",
                algorithm
            ))),
            (RS256 | RS384 | RS512 | PS256 | PS384 | PS512, Self::Pem(pem)) => {
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(invalid)
            }
            (ES256 | ES384, Self::Pem(pem)) => DecodingKey::from_ec_pem(pem.as_bytes()).map_err(invalid),
            (EdDSA, Self::Pem(pem)) => DecodingKey::from_ed_pem(pem.as_bytes()).map_err(invalid),
            #[allow(unreachable_patterns)]
            (other, _) => Err(AuthConfigError::InvalidAlgorithm(format!("{:?}", other))),
        }
    }
}

/// Extra claim requirements on top of signature and time-bound checks.
#[derive(Debug, Clone)]
pub struct TokenConstraints {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Clock skew tolerated on `exp`/`nbf`. Zero rejects a token as soon as `exp` passes.
    pub leeway_seconds: u64,
}

impl Default for TokenConstraints {
    fn default() -> Self {
        Self {
            subject: None,
            issuer: None,
            audience: None,
            leeway_seconds: 0,
        }
    }
}

/// Signed-token verifier.
///
/// `key` is `None` when no signing key was configured; every token is then refused as a
/// backend error instead of failing at startup.
#[derive(Clone)]
pub struct BearerVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl fmt::Debug for BearerVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("BearerVerifier")
            .field("has_key", &self.key.is_some())
            .field("validation", &self.validation)
            .finish()
    }
}

impl BearerVerifier {
    pub fn new(
        key: Option<&SigningKey>,
        algorithm: Algorithm,
        constraints: &TokenConstraints,
    ) -> Result<Self, AuthConfigError> {
        let key = key.map(|k| k.decoding_key(algorithm)).transpose()?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = constraints.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        // exp/nbf are checked when present; only configured constraints are mandatory.
        let mut required: Vec<&str> = Vec::new();
        if let Some(sub) = &constraints.subject {
            validation.sub = Some(sub.clone());
            required.push("sub");
        }
        if let Some(iss) = &constraints.issuer {
            validation.set_issuer(&[iss]);
            required.push("iss");
        }
        match &constraints.audience {
            Some(aud) => {
                validation.set_audience(&[aud]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(required.as_slice());

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AuthError::VerificationBackend("no signing key configured".into()))?;

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, key, &self.validation)
            .map_err(map_jwt_error)?;

        Ok(Claims::new(data.claims))
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidCredentials(Rejection::BadSignature),
        ErrorKind::InvalidAlgorithm => AuthError::InvalidCredentials(Rejection::AlgorithmMismatch),
        ErrorKind::ExpiredSignature => AuthError::InvalidCredentials(Rejection::Expired),
        ErrorKind::ImmatureSignature => AuthError::InvalidCredentials(Rejection::NotYetValid),
        ErrorKind::InvalidSubject
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::MissingRequiredClaim(_) => {
            AuthError::InvalidCredentials(Rejection::Claim(err.to_string()))
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::MalformedCredential(err.to_string()),
        _ => AuthError::VerificationBackend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, get_current_timestamp};
    use serde_json::json;

    const SECRET: &[u8] = b"a72cd591-5b57-4ffe-b6e3-e99c317ff43c";

    fn sign(alg: Algorithm, claims: Value) -> String {
        jsonwebtoken::encode(&Header::new(alg), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn verifier(constraints: TokenConstraints) -> BearerVerifier {
        BearerVerifier::new(
            Some(&SigningKey::Secret(SECRET.to_vec())),
            Algorithm::HS256,
            &constraints,
        )
        .unwrap()
    }

    fn access_token_constraints() -> TokenConstraints {
        TokenConstraints {
            subject: Some("AccessToken".into()),
            ..TokenConstraints::default()
        }
    }

    #[test]
    fn valid_token_yields_verbatim_claims() {
        let now = get_current_timestamp();
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "username": "alice", "exp": now + 600, "scope": ["otp"]}),
        );
        let claims = verifier(access_token_constraints()).verify(&token).unwrap();
        assert_eq!(claims.get_str("username"), Some("alice"));
        assert_eq!(claims.get("scope"), Some(&json!(["otp"])));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "exp": get_current_timestamp() + 600}),
        );
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let i = sig_start + 5;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let err = verifier(access_token_constraints()).verify(&tampered).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::BadSignature));
    }

    #[test]
    fn expired_token_has_distinct_reason() {
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "exp": get_current_timestamp() - 3600}),
        );
        let err = verifier(access_token_constraints()).verify(&token).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::Expired));
        assert_eq!(err.to_string(), "token is expired");
    }

    #[test]
    fn recently_expired_token_is_rejected_by_default() {
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "exp": get_current_timestamp() - 30}),
        );
        let err = verifier(access_token_constraints()).verify(&token).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::Expired));
    }

    #[test]
    fn leeway_tolerates_small_clock_skew() {
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "exp": get_current_timestamp() - 30}),
        );
        let constraints = TokenConstraints {
            leeway_seconds: 120,
            ..access_token_constraints()
        };
        assert!(verifier(constraints).verify(&token).is_ok());
    }

    #[test]
    fn token_without_exp_is_accepted() {
        let token = sign(Algorithm::HS256, json!({"sub": "x"}));
        let claims = verifier(TokenConstraints::default()).verify(&token).unwrap();
        assert_eq!(claims.subject(), Some("x"));
    }

    #[test]
    fn not_before_in_the_future_is_rejected() {
        let now = get_current_timestamp();
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "AccessToken", "exp": now + 7200, "nbf": now + 3600}),
        );
        let err = verifier(access_token_constraints()).verify(&token).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NotYetValid));
    }

    #[test]
    fn required_subject_is_enforced() {
        let token = sign(
            Algorithm::HS256,
            json!({"sub": "RefreshToken", "exp": get_current_timestamp() + 600}),
        );
        let err = verifier(access_token_constraints()).verify(&token).unwrap_err();
        assert!(matches!(err.rejection(), Some(Rejection::Claim(_))));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let token = sign(
            Algorithm::HS384,
            json!({"exp": get_current_timestamp() + 600}),
        );
        let err = verifier(TokenConstraints::default()).verify(&token).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::AlgorithmMismatch));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = verifier(TokenConstraints::default()).verify("not-a-jwt").unwrap_err();
        assert!(matches!(err, AuthError::MalformedCredential(_)));
    }

    #[test]
    fn missing_key_is_a_backend_error() {
        let verifier =
            BearerVerifier::new(None, Algorithm::HS256, &TokenConstraints::default()).unwrap();
        let token = sign(Algorithm::HS256, json!({"exp": get_current_timestamp() + 600}));
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::VerificationBackend(_))
        ));
    }

    #[test]
    fn secret_key_with_asymmetric_algorithm_is_a_config_error() {
        let err = BearerVerifier::new(
            Some(&SigningKey::Secret(SECRET.to_vec())),
            Algorithm::RS256,
            &TokenConstraints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthConfigError::InvalidSigningKey(_)));
    }
}

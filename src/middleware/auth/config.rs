//! Immutable middleware configuration.
//!
//! Built once through `AuthConfig::builder()` and shared as `Arc<AuthConfig>` by every request.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jsonwebtoken::Algorithm;

use super::error::AuthConfigError;
use super::hooks::{
    Continue, DenyNoneAuth, ErrorHook, NoneAuthHook, RequestFilter, SuccessHook, Unauthorized,
};
use super::lookup::{ExtractorChain, TokenLookup};
use super::schema::AuthSchema;
use super::verify::{
    BasicVerifier, BearerVerifier, IdentityStore, PasswordAuthenticator, SigningKey,
    SystemIdentityStore, TokenConstraints, Verifier,
};

pub const DEFAULT_CONTEXT_KEY: &str = "auth";

pub fn parse_algorithm(raw: &str) -> Result<Algorithm, AuthConfigError> {
    Algorithm::from_str(raw.trim()).map_err(|_| AuthConfigError::InvalidAlgorithm(raw.to_string()))
}

pub struct AuthConfig {
    allowed_schemas: Vec<AuthSchema>,
    token_lookup: TokenLookup,
    extractors: ExtractorChain,
    basic: Arc<Verifier>,
    bearer: Arc<Verifier>,
    algorithm: Algorithm,
    context_key: String,
    filter: Option<Arc<dyn RequestFilter>>,
    success: Arc<dyn SuccessHook>,
    error: Arc<dyn ErrorHook>,
    none_auth: Arc<dyn NoneAuthHook>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("allowed_schemas", &self.allowed_schemas)
            .field("token_lookup", &self.token_lookup.to_string())
            .field("algorithm", &self.algorithm)
            .field("context_key", &self.context_key)
            .field("filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    pub fn allowed_schemas(&self) -> &[AuthSchema] {
        &self.allowed_schemas
    }

    pub fn is_allowed(&self, schema: AuthSchema) -> bool {
        self.allowed_schemas.contains(&schema)
    }

    pub fn token_lookup(&self) -> &TokenLookup {
        &self.token_lookup
    }

    pub fn extractors(&self) -> &ExtractorChain {
        &self.extractors
    }

    /// Verifier for an allow-listed scheme; `None` for schemes without one (`Other`, `None`).
    pub fn verifier(&self, schema: AuthSchema) -> Option<Arc<Verifier>> {
        match schema {
            AuthSchema::Basic => Some(self.basic.clone()),
            AuthSchema::Bearer => Some(self.bearer.clone()),
            AuthSchema::None | AuthSchema::Other => None,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn context_key(&self) -> &str {
        &self.context_key
    }

    pub fn filter(&self) -> Option<&dyn RequestFilter> {
        self.filter.as_deref()
    }

    pub fn success_hook(&self) -> &dyn SuccessHook {
        self.success.as_ref()
    }

    pub fn error_hook(&self) -> &dyn ErrorHook {
        self.error.as_ref()
    }

    pub fn none_auth_hook(&self) -> &dyn NoneAuthHook {
        self.none_auth.as_ref()
    }
}

#[derive(Default)]
pub struct AuthConfigBuilder {
    allowed_schemas: Vec<AuthSchema>,
    token_lookup: Option<TokenLookup>,
    extractors: Option<ExtractorChain>,
    signing_key: Option<SigningKey>,
    algorithm: Option<Algorithm>,
    constraints: TokenConstraints,
    context_key: Option<String>,
    filter: Option<Arc<dyn RequestFilter>>,
    success: Option<Arc<dyn SuccessHook>>,
    error: Option<Arc<dyn ErrorHook>>,
    none_auth: Option<Arc<dyn NoneAuthHook>>,
    identities: Option<Arc<dyn IdentityStore>>,
    authenticator: Option<Arc<dyn PasswordAuthenticator>>,
}

impl AuthConfigBuilder {
    pub fn allowed_schemas(mut self, schemas: impl IntoIterator<Item = AuthSchema>) -> Self {
        self.allowed_schemas = schemas.into_iter().collect();
        self
    }

    pub fn token_lookup(mut self, lookup: TokenLookup) -> Self {
        self.token_lookup = Some(lookup);
        self
    }

    /// Replace the chain built from the token lookup (custom extractors).
    pub fn extractors(mut self, chain: ExtractorChain) -> Self {
        self.extractors = Some(chain);
        self
    }

    pub fn signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn token_constraints(mut self, constraints: TokenConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self
    }

    pub fn filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn success_hook(mut self, hook: impl SuccessHook + 'static) -> Self {
        self.success = Some(Arc::new(hook));
        self
    }

    pub fn error_hook(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.error = Some(Arc::new(hook));
        self
    }

    pub fn none_auth_hook(mut self, hook: impl NoneAuthHook + 'static) -> Self {
        self.none_auth = Some(Arc::new(hook));
        self
    }

    pub fn identity_store(mut self, store: impl IdentityStore + 'static) -> Self {
        self.identities = Some(Arc::new(store));
        self
    }

    pub fn password_authenticator(mut self, auth: impl PasswordAuthenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(auth));
        self
    }

    pub fn build(self) -> Result<AuthConfig, AuthConfigError> {
        // `None` can never be allow-listed: it always goes to the none-auth hook.
        let mut allowed_schemas: Vec<AuthSchema> = Vec::new();
        for schema in self.allowed_schemas {
            if schema != AuthSchema::None && !allowed_schemas.contains(&schema) {
                allowed_schemas.push(schema);
            }
        }
        if allowed_schemas.is_empty() {
            allowed_schemas = vec![AuthSchema::Basic, AuthSchema::Bearer];
        }

        let token_lookup = self.token_lookup.unwrap_or_default();
        let extractors = match self.extractors {
            Some(chain) => chain,
            None => ExtractorChain::from_lookup(&token_lookup)?,
        };

        let algorithm = self.algorithm.unwrap_or(Algorithm::HS256);
        let bearer = BearerVerifier::new(self.signing_key.as_ref(), algorithm, &self.constraints)?;

        let identities = self
            .identities
            .unwrap_or_else(|| Arc::new(SystemIdentityStore));
        let authenticator = self.authenticator.unwrap_or_else(default_authenticator);
        let basic = BasicVerifier::new(identities, authenticator);

        Ok(AuthConfig {
            allowed_schemas,
            token_lookup,
            extractors,
            basic: Arc::new(Verifier::Basic(basic)),
            bearer: Arc::new(Verifier::Bearer(bearer)),
            algorithm,
            context_key: self
                .context_key
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| DEFAULT_CONTEXT_KEY.to_string()),
            filter: self.filter,
            success: self.success.unwrap_or_else(|| Arc::new(Continue)),
            error: self.error.unwrap_or_else(|| Arc::new(Unauthorized)),
            none_auth: self.none_auth.unwrap_or_else(|| Arc::new(DenyNoneAuth)),
        })
    }
}

#[cfg(feature = "pam")]
fn default_authenticator() -> Arc<dyn PasswordAuthenticator> {
    Arc::new(super::verify::PamAuthenticator::new("login"))
}

#[cfg(not(feature = "pam"))]
fn default_authenticator() -> Arc<dyn PasswordAuthenticator> {
    Arc::new(super::verify::UnavailableAuthenticator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = AuthConfig::builder().build().unwrap();
        assert_eq!(config.allowed_schemas(), &[AuthSchema::Basic, AuthSchema::Bearer]);
        assert_eq!(config.token_lookup(), &TokenLookup::default());
        assert_eq!(config.extractors().len(), 1);
        assert_eq!(config.algorithm(), Algorithm::HS256);
        assert_eq!(config.context_key(), "auth");
        assert!(config.filter().is_none());
    }

    #[test]
    fn allowed_schemas_are_never_empty() {
        let config = AuthConfig::builder()
            .allowed_schemas([AuthSchema::None])
            .build()
            .unwrap();
        assert_eq!(config.allowed_schemas(), &[AuthSchema::Basic, AuthSchema::Bearer]);

        let config = AuthConfig::builder()
            .allowed_schemas([AuthSchema::Bearer, AuthSchema::Bearer])
            .build()
            .unwrap();
        assert_eq!(config.allowed_schemas(), &[AuthSchema::Bearer]);
        assert!(!config.is_allowed(AuthSchema::Basic));
    }

    #[test]
    fn verifiers_exist_only_for_recognized_schemes() {
        let config = AuthConfig::builder().build().unwrap();
        assert!(matches!(
            config.verifier(AuthSchema::Basic).as_deref(),
            Some(Verifier::Basic(_))
        ));
        assert!(matches!(
            config.verifier(AuthSchema::Bearer).as_deref(),
            Some(Verifier::Bearer(_))
        ));
        assert!(config.verifier(AuthSchema::Other).is_none());
    }

    #[test]
    fn parses_algorithm_names() {
        assert_eq!(parse_algorithm("HS512").unwrap(), Algorithm::HS512);
        assert_eq!(parse_algorithm(" EdDSA ").unwrap(), Algorithm::EdDSA);
        assert!(matches!(
            parse_algorithm("none"),
            Err(AuthConfigError::InvalidAlgorithm(_))
        ));
    }
}

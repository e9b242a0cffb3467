/// Factory: build the request authentication config from application settings.
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::middleware::auth::{AuthConfig, AuthConfigError, AuthSchema, PathFilter};

pub fn build_auth_config(settings: &AuthSettings) -> Result<Arc<AuthConfig>, AuthConfigError> {
    let mut builder = AuthConfig::builder()
        .allowed_schemas(settings.schemas.iter().copied())
        .token_lookup(settings.token_lookup.clone())
        .algorithm(settings.algorithm)
        .token_constraints(settings.constraints.clone())
        .context_key(settings.context_key.clone());

    if let Some(key) = &settings.signing_key {
        builder = builder.signing_key(key.clone());
    }
    for warning in startup_warnings(settings) {
        tracing::warn!("{warning}");
    }

    let skip = PathFilter::parse(&settings.skip_paths);
    if !skip.is_empty() {
        builder = builder.filter(skip);
    }

    #[cfg(feature = "pam")]
    {
        builder = builder.password_authenticator(
            crate::middleware::auth::verify::PamAuthenticator::new(settings.pam_service.clone()),
        );
    }

    Ok(Arc::new(builder.build()?))
}

const NO_SIGNING_KEY: &str = "no signing key configured; every bearer token will be rejected";
const NO_PASSWORD_BACKEND: &str =
    "built without the `pam` feature; every basic credential will be rejected";

/// Allowed schemes that cannot succeed with these settings.
fn startup_warnings(settings: &AuthSettings) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if settings.signing_key.is_none() && settings.schemas.contains(&AuthSchema::Bearer) {
        warnings.push(NO_SIGNING_KEY);
    }
    if !cfg!(feature = "pam") && settings.schemas.contains(&AuthSchema::Basic) {
        warnings.push(NO_PASSWORD_BACKEND);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::SigningKey;

    #[test]
    fn defaults_build_with_skip_filter() {
        let settings = AuthSettings {
            signing_key: Some(SigningKey::Secret(b"secret".to_vec())),
            ..AuthSettings::default()
        };
        let config = build_auth_config(&settings).unwrap();
        assert_eq!(config.allowed_schemas(), &[AuthSchema::Basic, AuthSchema::Bearer]);
        assert_eq!(config.context_key(), "auth");
        assert!(config.filter().is_some());
    }

    #[test]
    fn empty_skip_paths_install_no_filter() {
        let settings = AuthSettings {
            skip_paths: " , ".to_string(),
            schemas: vec![AuthSchema::Bearer],
            ..AuthSettings::default()
        };
        let config = build_auth_config(&settings).unwrap();
        assert!(config.filter().is_none());
        assert!(!config.is_allowed(AuthSchema::Basic));
    }

    #[test]
    fn unusable_schemes_are_warned_about() {
        let settings = AuthSettings {
            schemas: vec![AuthSchema::Bearer],
            ..AuthSettings::default()
        };
        assert_eq!(startup_warnings(&settings), vec![NO_SIGNING_KEY]);

        let settings = AuthSettings {
            signing_key: Some(SigningKey::Secret(b"secret".to_vec())),
            schemas: vec![AuthSchema::Bearer],
            ..AuthSettings::default()
        };
        assert!(startup_warnings(&settings).is_empty());
    }

    #[cfg(not(feature = "pam"))]
    #[test]
    fn basic_without_password_backend_is_warned_about() {
        let settings = AuthSettings {
            signing_key: Some(SigningKey::Secret(b"secret".to_vec())),
            ..AuthSettings::default()
        };
        assert_eq!(startup_warnings(&settings), vec![NO_PASSWORD_BACKEND]);
    }

    #[test]
    fn mismatched_key_and_algorithm_fail() {
        let settings = AuthSettings {
            signing_key: Some(SigningKey::Secret(b"secret".to_vec())),
            algorithm: jsonwebtoken::Algorithm::RS256,
            ..AuthSettings::default()
        };
        assert!(build_auth_config(&settings).is_err());
    }
}

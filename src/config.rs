/*
 * Responsibility
 * - CLI フラグ / 環境変数からの設定読み込み (ポート、データパス、ログ、Auth 設定など)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;

use jsonwebtoken::Algorithm;

use crate::cli::{LogFormat, StartArgs};
use crate::middleware::auth::{
    AuthSchema, SigningKey, TokenConstraints, TokenLookup, parse_algorithm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Settings for the request authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub enabled: bool,
    pub schemas: Vec<AuthSchema>,
    pub token_lookup: TokenLookup,
    pub signing_key: Option<SigningKey>,
    pub algorithm: Algorithm,
    pub constraints: TokenConstraints,
    pub context_key: String,
    pub skip_paths: String,
    pub pam_service: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            schemas: vec![AuthSchema::Basic, AuthSchema::Bearer],
            token_lookup: TokenLookup::default(),
            signing_key: None,
            algorithm: Algorithm::HS256,
            constraints: TokenConstraints {
                subject: Some("AccessToken".to_string()),
                ..TokenConstraints::default()
            },
            context_key: "auth".to_string(),
            skip_paths: "/health,/api/v1/ping,/api/v1/validate*".to_string(),
            pam_service: "login".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // empty or ":memory:" keeps accounts in memory only
    pub data_path: String,
    pub log: LogConfig,
    pub cors_allowed_origins: Vec<String>,
    pub otp_issuer: String,
    pub auth: AuthSettings,
}

impl Config {
    pub fn load(args: &StartArgs) -> Result<Self, ConfigError> {
        let addr = SocketAddr::new(args.bind, args.port);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let otp_issuer = std::env::var("OTP_ISSUER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "otpd".to_string());

        Ok(Self {
            addr,
            app_env: AppEnv::from_env(),
            data_path: args.data_path.clone(),
            log: LogConfig {
                level: args.log_level.clone(),
                format: args.log_format,
            },
            cors_allowed_origins,
            otp_issuer,
            auth: AuthSettings::from_env()?,
        })
    }

    /// Defaults for a local, in-memory instance.
    pub fn local(addr: SocketAddr) -> Self {
        Self {
            addr,
            app_env: AppEnv::Development,
            data_path: String::new(),
            log: LogConfig {
                level: "info".to_string(),
                format: LogFormat::Console,
            },
            cors_allowed_origins: Vec::new(),
            otp_issuer: "otpd".to_string(),
            auth: AuthSettings::default(),
        }
    }
}

impl AuthSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let enabled = match std::env::var("AUTH_ENABLED") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("AUTH_ENABLED"))?,
            Err(_) => defaults.enabled,
        };

        let schemas = match std::env::var("AUTH_SCHEMAS") {
            Ok(v) => v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<AuthSchema>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::Invalid("AUTH_SCHEMAS"))?,
            Err(_) => defaults.schemas,
        };

        let token_lookup = match std::env::var("AUTH_TOKEN_LOOKUP") {
            Ok(v) => TokenLookup::parse(&v).map_err(|_| ConfigError::Invalid("AUTH_TOKEN_LOOKUP"))?,
            Err(_) => defaults.token_lookup,
        };

        let algorithm = match std::env::var("AUTH_ALGORITHM") {
            Ok(v) => parse_algorithm(&v).map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?,
            Err(_) => defaults.algorithm,
        };

        // Shared secret (HS*) or PEM public key (RS*/PS*/ES*/EdDSA).
        let signing_key = match (
            std::env::var("AUTH_SIGNING_KEY").ok().filter(|s| !s.is_empty()),
            std::env::var("AUTH_SIGNING_KEY_PEM").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(_), Some(_)) => return Err(ConfigError::Invalid("AUTH_SIGNING_KEY_PEM")),
            (Some(secret), None) => Some(SigningKey::Secret(secret.into_bytes())),
            (None, Some(pem)) => Some(SigningKey::Pem(pem.replace("\\n", "\n"))),
            (None, None) => None,
        };

        let subject = match std::env::var("AUTH_REQUIRED_SUBJECT") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(v),
            Err(_) => defaults.constraints.subject,
        };

        let leeway_seconds = parse_leeway(
            std::env::var("AUTH_LEEWAY_SECONDS").ok().as_deref(),
            defaults.constraints.leeway_seconds,
        )?;

        let constraints = TokenConstraints {
            subject,
            issuer: std::env::var("AUTH_ISSUER").ok().filter(|s| !s.is_empty()),
            audience: std::env::var("AUTH_AUDIENCE").ok().filter(|s| !s.is_empty()),
            leeway_seconds,
        };

        Ok(Self {
            enabled,
            schemas,
            token_lookup,
            signing_key,
            algorithm,
            constraints,
            context_key: std::env::var("AUTH_CONTEXT_KEY").unwrap_or(defaults.context_key),
            skip_paths: std::env::var("AUTH_SKIP_PATHS").unwrap_or(defaults.skip_paths),
            pam_service: std::env::var("AUTH_PAM_SERVICE").unwrap_or(defaults.pam_service),
        })
    }
}

fn parse_leeway(raw: Option<&str>, default: u64) -> Result<u64, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid("AUTH_LEEWAY_SECONDS")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderValue;

use super::error::AuthConfigError;

/// Credential scheme presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthSchema {
    /// No (or an empty) `Authorization` header.
    None,
    Basic,
    Bearer,
    /// A header is present but matches neither recognized prefix.
    Other,
}

impl AuthSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic => "Basic",
            Self::Bearer => "Bearer",
            Self::Other => "Other",
        }
    }

    /// Classify a raw `Authorization` header value. Works on bytes so that a
    /// non UTF-8 header still counts as "present".
    pub fn classify(header: Option<&HeaderValue>) -> Self {
        let raw = match header {
            Some(value) if !value.is_empty() => value.as_bytes(),
            _ => return Self::None,
        };

        if has_prefix_ignore_case(raw, Self::Basic.as_str()) {
            Self::Basic
        } else if has_prefix_ignore_case(raw, Self::Bearer.as_str()) {
            Self::Bearer
        } else {
            Self::Other
        }
    }
}

pub(crate) fn has_prefix_ignore_case(raw: &[u8], prefix: &str) -> bool {
    raw.len() >= prefix.len() && raw[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

impl fmt::Display for AuthSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthSchema {
    type Err = AuthConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            "other" => Ok(Self::Other),
            "none" => Ok(Self::None),
            _ => Err(AuthConfigError::UnknownSchema(s.to_string())),
        }
    }
}

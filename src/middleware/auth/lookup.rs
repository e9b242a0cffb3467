//! Token lookup: where the raw credential is read from, and in which order.
//!
//! `TokenLookup` is parsed once from a `source:name[,source:name...]` string and turned into an
//! `ExtractorChain`. At request time the chain tries each extractor in order and stops at the
//! first one that yields a non-empty credential.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::extract::{Query, RawPathParams};
use axum::http::{HeaderMap, HeaderName, Uri, header, request::Parts};
use axum_extra::extract::CookieJar;

use super::error::{AuthConfigError, AuthError};
use super::schema::{AuthSchema, has_prefix_ignore_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Header,
    Query,
    Param,
    Cookie,
}

impl LookupSource {
    fn parse(raw: &str) -> Result<Self, AuthConfigError> {
        match raw {
            "header" => Ok(Self::Header),
            "query" => Ok(Self::Query),
            "param" => Ok(Self::Param),
            "cookie" => Ok(Self::Cookie),
            other => Err(AuthConfigError::UnknownSource(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Param => "param",
            Self::Cookie => "cookie",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub source: LookupSource,
    pub name: String,
}

/// Ordered list of credential locations. Order is the fallback priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLookup(Vec<LookupEntry>);

impl Default for TokenLookup {
    fn default() -> Self {
        Self(vec![LookupEntry {
            source: LookupSource::Header,
            name: header::AUTHORIZATION.as_str().to_string(),
        }])
    }
}

impl TokenLookup {
    pub fn parse(spec: &str) -> Result<Self, AuthConfigError> {
        let mut entries = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (source, name) = part
                .split_once(':')
                .ok_or_else(|| AuthConfigError::InvalidLookup(part.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(AuthConfigError::InvalidLookup(part.to_string()));
            }
            entries.push(LookupEntry {
                source: LookupSource::parse(source.trim())?,
                name: name.to_string(),
            });
        }

        if entries.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.0
    }
}

impl fmt::Display for TokenLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", entry.source.as_str(), entry.name)?;
        }
        Ok(())
    }
}

/// Read-only view of the parts of a request an extractor may look at.
pub struct LookupContext<'a> {
    headers: &'a HeaderMap,
    uri: &'a Uri,
    params: Option<&'a RawPathParams>,
}

impl<'a> LookupContext<'a> {
    pub fn new(parts: &'a Parts, params: Option<&'a RawPathParams>) -> Self {
        Self {
            headers: &parts.headers,
            uri: &parts.uri,
            params,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        self.headers
    }

    pub fn query(&self, name: &str) -> Option<String> {
        Query::<HashMap<String, String>>::try_from_uri(self.uri)
            .ok()
            .and_then(|Query(mut q)| q.remove(name))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params?
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        CookieJar::from_headers(self.headers)
            .get(name)
            .map(|c| c.value().to_string())
    }
}

/// Pulls a raw credential string out of one request location.
pub trait CredentialExtractor: Send + Sync {
    fn extract(&self, ctx: &LookupContext<'_>, schema: AuthSchema) -> Result<String, AuthError>;
}

/// Built-in extractor for one `source:name` lookup entry.
#[derive(Debug, Clone)]
pub enum SourceExtractor {
    Header(HeaderName),
    Query(String),
    Param(String),
    Cookie(String),
}

impl SourceExtractor {
    pub fn from_entry(entry: &LookupEntry) -> Result<Self, AuthConfigError> {
        Ok(match entry.source {
            LookupSource::Header => {
                let name = HeaderName::try_from(entry.name.as_str())
                    .map_err(|_| AuthConfigError::InvalidHeaderName(entry.name.clone()))?;
                Self::Header(name)
            }
            LookupSource::Query => Self::Query(entry.name.clone()),
            LookupSource::Param => Self::Param(entry.name.clone()),
            LookupSource::Cookie => Self::Cookie(entry.name.clone()),
        })
    }
}

impl CredentialExtractor for SourceExtractor {
    fn extract(&self, ctx: &LookupContext<'_>, schema: AuthSchema) -> Result<String, AuthError> {
        let value = match self {
            // `<Schema> <credential>`; the scheme name must match the classified scheme.
            Self::Header(name) => ctx.headers().get(name).and_then(|raw| {
                let prefix = schema.as_str();
                let bytes = raw.as_bytes();
                let l = prefix.len();
                if bytes.len() > l + 1 && has_prefix_ignore_case(bytes, prefix) && bytes[l] == b' '
                {
                    raw.to_str().ok().map(|s| s[l + 1..].to_string())
                } else {
                    None
                }
            }),
            Self::Query(name) => ctx.query(name),
            Self::Param(name) => ctx.param(name).map(str::to_string),
            Self::Cookie(name) => ctx.cookie(name),
        };

        match value {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(AuthError::ExtractionFailure),
        }
    }
}

/// Extractors in lookup order.
#[derive(Clone, Default)]
pub struct ExtractorChain {
    extractors: Vec<Arc<dyn CredentialExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Arc<dyn CredentialExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn from_lookup(lookup: &TokenLookup) -> Result<Self, AuthConfigError> {
        let extractors = lookup
            .entries()
            .iter()
            .map(|entry| {
                SourceExtractor::from_entry(entry)
                    .map(|e| Arc::new(e) as Arc<dyn CredentialExtractor>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extractors })
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// First non-empty credential wins; otherwise the last failure is returned.
    pub fn run(&self, ctx: &LookupContext<'_>, schema: AuthSchema) -> Result<String, AuthError> {
        let mut last = AuthError::ExtractionFailure;
        for extractor in &self.extractors {
            match extractor.extract(ctx, schema) {
                Ok(credential) if !credential.is_empty() => return Ok(credential),
                Ok(_) => last = AuthError::ExtractionFailure,
                Err(err) => last = err,
            }
        }
        Err(last)
    }
}

impl fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorChain")
            .field("len", &self.extractors.len())
            .finish()
    }
}

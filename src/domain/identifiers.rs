//! Slug and catalog id validation.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static CATALOG_ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[0-9a-f]{32}$").ok());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("slug is empty")]
    EmptySlug,

    #[error("slug '{0}' contains a path separator")]
    PathSeparator(String),

    #[error("'{0}' is not a 32-character lowercase hex id")]
    MalformedId(String),
}

/// A slug safe to splice into an origin path and a cache key.
pub fn validate_slug(slug: &str) -> Result<&str, IdentifierError> {
    let trimmed = slug.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::EmptySlug);
    }
    if trimmed.contains(['/', '\\']) {
        return Err(IdentifierError::PathSeparator(slug.to_string()));
    }
    Ok(trimmed)
}

/// Opaque 32-hex catalog identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let matches = CATALOG_ID_PATTERN
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(raw));
        if matches {
            Ok(Self(raw.to_string()))
        } else {
            Err(IdentifierError::MalformedId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//! Generation identifiers and the `<app-id>-<generation>` cache naming scheme.

use serde::{Deserialize, Serialize};

use crate::Error;

const SEPARATOR: char = '-';

/// Opaque per-deploy version tag, e.g. `v9`.
///
/// Must be non-empty and must not contain `-` or whitespace, so that a cache
/// name always splits back into the same app id and generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Generation(String);

impl Generation {
    pub fn new(tag: impl Into<String>) -> Result<Self, Error> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(Error::InvalidInput("generation must not be empty".into()));
        }
        if tag.contains(SEPARATOR) || tag.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!(
                "generation `{tag}` must not contain `{SEPARATOR}` or whitespace"
            )));
        }
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Generation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Generation> for String {
    fn from(value: Generation) -> Self {
        value.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of one cache generation in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheName {
    app_id: String,
    generation: Generation,
}

impl CacheName {
    pub fn new(app_id: impl Into<String>, generation: Generation) -> Result<Self, Error> {
        let app_id = app_id.into();
        if app_id.is_empty() {
            return Err(Error::InvalidInput("app id must not be empty".into()));
        }
        Ok(Self { app_id, generation })
    }

    /// Split a stored cache name at its last `-`.
    ///
    /// Returns `None` for names that do not follow the scheme (caches created
    /// by other scopes on the same origin).
    pub fn parse(name: &str) -> Option<Self> {
        let (app_id, tag) = name.rsplit_once(SEPARATOR)?;
        if app_id.is_empty() {
            return None;
        }
        let generation = Generation::new(tag).ok()?;
        Some(Self { app_id: app_id.to_string(), generation })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// True when `name` is a cache of the same app, whatever its generation.
    pub fn is_sibling(&self, name: &str) -> bool {
        Self::parse(name).is_some_and(|other| other.app_id == self.app_id)
    }
}

impl std::fmt::Display for CacheName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.app_id, self.generation)
    }
}

//! Registration scope: which URLs this worker may cache or intercept.

use glassboat_core::Error;
use url::Url;

/// Error type for scope resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{url} is outside scope {scope}")]
    Outside { url: String, scope: String },
}

impl From<ScopeError> for Error {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Outside { .. } => Error::OutOfScope(err.to_string()),
            other => Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Origin plus path prefix a worker is registered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: Url,
}

impl Scope {
    /// Build a scope from an http(s) origin and a `/`-terminated path.
    pub fn new(origin: &str, path: &str) -> Result<Self, ScopeError> {
        let origin = origin.trim();
        if origin.is_empty() {
            return Err(ScopeError::Empty);
        }

        let parsed = Url::parse(origin).map_err(|e| ScopeError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(ScopeError::UnsupportedScheme(scheme.to_string())),
        }

        let mut base = parsed.join(path).map_err(|e| ScopeError::InvalidUrl(e.to_string()))?;
        base.set_query(None);
        base.set_fragment(None);

        if !base.path().ends_with('/') {
            return Err(ScopeError::InvalidUrl(format!("scope path must end with `/`: {path}")));
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a manifest entry or page reference against the scope.
    ///
    /// Normalization steps:
    /// 1. Trim whitespace
    /// 2. Join relative references onto the scope base
    /// 3. Remove fragment (#...)
    /// 4. Reject anything that lands outside origin + path prefix
    pub fn resolve(&self, input: &str) -> Result<Url, ScopeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ScopeError::Empty);
        }

        let mut url = self.base.join(trimmed).map_err(|e| ScopeError::InvalidUrl(e.to_string()))?;
        url.set_fragment(None);

        if !self.contains(&url) {
            return Err(ScopeError::Outside { url: url.to_string(), scope: self.base.to_string() });
        }
        Ok(url)
    }

    /// Same origin and path under the scope prefix.
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.base.origin() && url.path().starts_with(self.base.path())
    }
}

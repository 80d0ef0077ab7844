//! Canonical request keys for cache lookups.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Request;

/// Canonical identity of a cacheable request: method plus URL.
///
/// The fragment never participates. The query string participates unless the
/// store was configured with `ignore_search`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url, ignore_search: bool) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        if ignore_search {
            url.set_query(None);
        }
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    pub fn for_request(request: &Request, ignore_search: bool) -> Self {
        Self::new(&request.method, &request.url, ignore_search)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `METHOD URL`, the human-readable form of the key.
    pub fn canonical(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// SHA-256 of the canonical form, used as the storage index.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

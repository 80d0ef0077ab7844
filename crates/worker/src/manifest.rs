//! The asset manifest: URLs that must be cached before a generation may activate.

use glassboat_core::{Error, RequestKey};
use url::Url;

use crate::fetch::Scope;

/// Ordered, de-duplicated list of in-scope asset URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    assets: Vec<Url>,
}

impl AssetManifest {
    /// Resolve configured entries against the scope.
    ///
    /// # Errors
    ///
    /// `OUT_OF_SCOPE` or `INVALID_URL` for the first entry that does not
    /// resolve inside the scope.
    pub fn resolve(scope: &Scope, entries: &[String]) -> Result<Self, Error> {
        let mut assets: Vec<Url> = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = scope.resolve(entry)?;
            if !assets.contains(&url) {
                assets.push(url);
            }
        }
        Ok(Self { assets })
    }

    pub fn assets(&self) -> &[Url] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// GET keys of every asset under the given query policy.
    pub fn keys(&self, ignore_search: bool) -> Vec<RequestKey> {
        self.assets
            .iter()
            .map(|url| RequestKey::new("GET", url, ignore_search))
            .collect()
    }
}

//! Pre-caching the asset manifest into a fresh generation.
//!
//! Installation is all-or-nothing: every asset is fetched before anything is
//! written, the write is a single atomic batch, and a generation created by a
//! failed attempt is deleted again.

use futures_util::future::try_join_all;
use glassboat_core::{CacheStore, Destination, Error, Request, RequestKey, Response, StoredResponse};
use serde::Serialize;
use url::Url;

use crate::fetch::{CacheMode, Network};
use crate::manifest::AssetManifest;

/// Outcome of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache: String,
    pub assets: usize,
    /// True when the generation already held every asset and nothing was fetched.
    pub reused: bool,
}

fn guess_destination(url: &Url) -> Destination {
    let path = url.path();
    if path.ends_with('/') || path.ends_with(".html") {
        Destination::Document
    } else if path.ends_with(".js") || path.ends_with(".mjs") {
        Destination::Script
    } else if path.ends_with(".css") {
        Destination::Style
    } else {
        Destination::Other
    }
}

async fn fetch_asset(network: &dyn Network, url: &Url) -> Result<Response, Error> {
    let request = Request::get(url.clone(), guess_destination(url));
    let response = network
        .fetch(&request, CacheMode::Reload)
        .await
        .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

    if !response.is_success() || response.status == 206 {
        return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
    }
    Ok(response)
}

/// Populate `cache` with every manifest asset.
///
/// # Errors
///
/// `INSTALL_FAILED` naming the first asset that could not be fetched, or the
/// cache itself when the batch write fails. No partial generation survives.
pub async fn install(
    store: &dyn CacheStore, network: &dyn Network, manifest: &AssetManifest, cache: &str, ignore_search: bool,
) -> Result<InstallReport, Error> {
    let keys = manifest.keys(ignore_search);

    if store.contains_all(cache, &keys).await? {
        tracing::info!(cache, assets = keys.len(), "generation already installed; nothing to fetch");
        return Ok(InstallReport { cache: cache.to_string(), assets: keys.len(), reused: true });
    }

    let existed = store.list_generations().await?.iter().any(|name| name == cache);

    let responses = try_join_all(manifest.assets().iter().map(|url| fetch_asset(network, url))).await?;

    let entries: Vec<(RequestKey, StoredResponse)> = keys
        .into_iter()
        .zip(responses.iter().map(StoredResponse::from_response))
        .collect();

    if let Err(e) = store.put_all(cache, entries).await {
        if !existed && let Err(cleanup) = store.delete_generation(cache).await {
            tracing::warn!(cache, error = %cleanup, "failed to remove partial generation");
        }
        return Err(Error::InstallFailed { url: cache.to_string(), reason: e.to_string() });
    }

    tracing::info!(cache, assets = responses.len(), "pre-cached asset manifest");
    Ok(InstallReport { cache: cache.to_string(), assets: responses.len(), reused: false })
}

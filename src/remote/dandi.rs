use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use super::{recording_from_asset_metadata, ArchiveClient, RemoteAsset, RemoteError};
use crate::nwb::{SourceLocation, SourceRecording};

/// Public DANDI API root
pub const DANDI_API_URL: &str = "https://api.dandiarchive.org/api";

const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct AssetPage {
    next: Option<String>,
    results: Vec<AssetEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetEntry {
    asset_id: String,
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Blocking client of the DANDI REST API
#[derive(Debug, Clone)]
pub struct DandiApiClient {
    client: Client,
    base_url: String,
}

impl DandiApiClient {
    /// Client of the public archive
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_base_url(DANDI_API_URL)
    }

    /// Client of another DANDI instance (e.g. the staging server)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("nwb2bids/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn download_url(&self, asset_id: &str) -> String {
        format!("{}/assets/{}/download/", self.base_url, asset_id)
    }

    fn get(&self, url: &str) -> Result<Response, RemoteError> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl ArchiveClient for DandiApiClient {
    fn list_assets(&self, dandiset_id: &str, version: &str) -> Result<Vec<RemoteAsset>, RemoteError> {
        let mut url = Some(format!(
            "{}/dandisets/{}/versions/{}/assets/?page_size={}",
            self.base_url, dandiset_id, version, PAGE_SIZE
        ));

        let mut assets = Vec::new();
        while let Some(page_url) = url.take() {
            let page: AssetPage = self.get(&page_url)?.json()?;
            assets.extend(page.results.into_iter().map(|entry| RemoteAsset {
                dandiset_id: dandiset_id.to_string(),
                version: version.to_string(),
                download_url: self.download_url(&entry.asset_id),
                asset_id: entry.asset_id,
                path: entry.path,
                size: entry.size,
            }));
            url = page.next;
        }

        let total = assets.len();
        assets.retain(RemoteAsset::is_nwb);
        log::info!(
            "Dandiset {}/{}: {} assets, {} NWB files",
            dandiset_id,
            version,
            total,
            assets.len()
        );
        Ok(assets)
    }

    fn load_recording(&self, asset: &RemoteAsset) -> Result<SourceRecording, RemoteError> {
        let url = format!(
            "{}/dandisets/{}/versions/{}/assets/{}/",
            self.base_url, asset.dandiset_id, asset.version, asset.asset_id
        );
        let metadata: Value = self.get(&url)?.json()?;
        recording_from_asset_metadata(asset, &metadata)
    }

    fn download(&self, location: &SourceLocation, destination: &Path) -> Result<u64, RemoteError> {
        let SourceLocation::Remote { url, .. } = location else {
            return Err(RemoteError::NotRemote(location.to_string()));
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut response = self.get(url)?;
        let mut file = File::create(destination)?;
        let written = response.copy_to(&mut file)?;
        log::info!(
            "Downloaded {} ({} bytes) to {}",
            location,
            written,
            destination.display()
        );
        Ok(written)
    }
}

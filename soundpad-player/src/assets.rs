//! Sound asset retrieval
//!
//! Clips live under `sounds/` relative to an asset root, which is either a
//! local directory or an HTTP(S) base URL. Either way a clip is fetched as a
//! whole byte buffer.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("soundpad/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where sound clips are loaded from
#[derive(Debug, Clone)]
pub enum AssetStore {
    /// Local directory root
    Directory(PathBuf),
    /// Remote base URL (no trailing slash)
    Http { base: String, client: reqwest::Client },
}

impl AssetStore {
    /// Build a store from a configured root: `http://` / `https://` URLs are
    /// fetched remotely, anything else is a local directory.
    pub fn from_root(root: &str) -> Result<Self> {
        if root.starts_with("http://") || root.starts_with("https://") {
            let client = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

            Ok(AssetStore::Http {
                base: root.trim_end_matches('/').to_string(),
                client,
            })
        } else {
            Ok(AssetStore::Directory(PathBuf::from(root)))
        }
    }

    /// Human-readable root, for logs
    pub fn describe(&self) -> String {
        match self {
            AssetStore::Directory(dir) => dir.display().to_string(),
            AssetStore::Http { base, .. } => base.clone(),
        }
    }

    /// Fetch the asset at `relative` (e.g. `sounds/B.mp3`).
    ///
    /// # Errors
    /// `Error::Fetch` when the asset is missing, unreadable, or the server
    /// answers with a non-success status.
    pub async fn fetch(&self, relative: &str) -> Result<Vec<u8>> {
        match self {
            AssetStore::Directory(root) => {
                let path = root.join(relative);
                debug!(path = %path.display(), "Reading sound asset");
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::Fetch(format!("{}: {}", path.display(), e)))
            }
            AssetStore::Http { base, client } => {
                let url = format!("{}/{}", base, relative);
                debug!(url = %url, "Fetching sound asset");

                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(Error::Fetch(format!("{}: HTTP {}", url, status.as_u16())));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::Fetch(format!("{}: {}", url, e)))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

//! Manifest providers
//!
//! The manifest is the ordered list of every image identifier in the
//! gallery, served as `config/images.json`:
//!
//! ```json
//! { "imagesList": ["a.jpg", "b.png"] }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Location of the manifest relative to the gallery root
pub const MANIFEST_PATH: &str = "config/images.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub images_list: Vec<String>,
}

impl Manifest {
    pub fn new(images_list: Vec<String>) -> Self {
        Self { images_list }
    }

    pub fn len(&self) -> usize {
        self.images_list.len()
    }

    /// Drop repeated identifiers, keeping the first occurrence in place
    pub fn dedup(mut self) -> Self {
        let mut seen = HashSet::new();
        let before = self.images_list.len();
        self.images_list.retain(|name| seen.insert(name.clone()));

        let dropped = before - self.images_list.len();
        if dropped > 0 {
            warn!(dropped, "manifest listed duplicate identifiers");
        }
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Source of the gallery manifest
#[async_trait]
pub trait ManifestProvider: Send + Sync {
    async fn fetch(&self) -> Result<Manifest, ManifestError>;
}

/// Reads `config/images.json` below a gallery root on disk
#[derive(Debug, Clone)]
pub struct FsManifestProvider {
    path: PathBuf,
}

impl FsManifestProvider {
    pub fn new(gallery_root: &Path) -> Self {
        Self {
            path: gallery_root.join(MANIFEST_PATH),
        }
    }
}

#[async_trait]
impl ManifestProvider for FsManifestProvider {
    async fn fetch(&self) -> Result<Manifest, ManifestError> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ManifestError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(Manifest::from_json(&data)?)
    }
}

/// Fetches the manifest from the server that hosts the gallery
#[derive(Debug, Clone)]
pub struct HttpManifestProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpManifestProvider {
    pub fn new(base_url: &str) -> Result<Self, ManifestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/{MANIFEST_PATH}", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ManifestProvider for HttpManifestProvider {
    async fn fetch(&self) -> Result<Manifest, ManifestError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(Manifest::from_json(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let manifest = Manifest::from_json(r#"{"imagesList":["a.jpg","b.jpg"]}"#).unwrap();
        assert_eq!(manifest.images_list, vec!["a.jpg", "b.jpg"]);
        assert!(manifest.to_json().unwrap().contains("\"imagesList\""));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let manifest = Manifest::new(vec!["a".into(), "b".into(), "a".into(), "c".into()]).dedup();
        assert_eq!(manifest.images_list, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_fs_provider_reads_and_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        let provider = FsManifestProvider::new(dir.path());

        let missing = provider.fetch().await.unwrap_err();
        assert!(matches!(missing, ManifestError::Io { .. }));

        std::fs::write(dir.path().join(MANIFEST_PATH), "{ not json").unwrap();
        let garbage = provider.fetch().await.unwrap_err();
        assert!(matches!(garbage, ManifestError::Malformed(_)));

        std::fs::write(dir.path().join(MANIFEST_PATH), r#"{"imagesList":["x.png"]}"#).unwrap();
        assert_eq!(provider.fetch().await.unwrap().images_list, vec!["x.png"]);
    }
}

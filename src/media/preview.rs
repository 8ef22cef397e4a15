//! Preview decoding
//! Loads the preview variant of an image and reports its intrinsic size

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::state::data::{preview_path, Dimensions};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode {filename}: {source}")]
    Image {
        filename: String,
        source: image::ImageError,
    },

    #[error("failed to fetch {filename}: {source}")]
    Http {
        filename: String,
        source: reqwest::Error,
    },

    #[error("decode task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Decodes one preview and returns its dimensions
#[async_trait]
pub trait PreviewDecoder: Send + Sync {
    async fn decode(&self, filename: &str) -> Result<Dimensions, DecodeError>;
}

/// Decodes previews straight from a gallery directory on disk
#[derive(Debug, Clone)]
pub struct FsPreviewDecoder {
    root: PathBuf,
}

impl FsPreviewDecoder {
    pub fn new(gallery_root: &Path) -> Self {
        Self {
            root: gallery_root.to_path_buf(),
        }
    }
}

#[async_trait]
impl PreviewDecoder for FsPreviewDecoder {
    async fn decode(&self, filename: &str) -> Result<Dimensions, DecodeError> {
        let path = self.root.join(preview_path(filename));
        let filename = filename.to_string();

        // Spawn blocking task for CPU-bound work
        tokio::task::spawn_blocking(move || {
            // Header read first; formats without a cheap size probe get a full decode
            let (width, height) = match image::image_dimensions(&path) {
                Ok(size) => size,
                Err(_) => {
                    let img = image::open(&path)
                        .map_err(|source| DecodeError::Image { filename, source })?;
                    (img.width(), img.height())
                }
            };
            Ok(Dimensions { width, height })
        })
        .await?
    }
}

/// Downloads previews from the server hosting the gallery, then decodes them
#[derive(Debug, Clone)]
pub struct HttpPreviewDecoder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPreviewDecoder {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, reqwest::Error> {
        let url = format!("{}/{}", self.base_url, preview_path(filename));
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PreviewDecoder for HttpPreviewDecoder {
    async fn decode(&self, filename: &str) -> Result<Dimensions, DecodeError> {
        let data = self
            .fetch(filename)
            .await
            .map_err(|source| DecodeError::Http {
                filename: filename.to_string(),
                source,
            })?;
        let filename = filename.to_string();

        tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory(&data)
                .map_err(|source| DecodeError::Image { filename, source })?;
            Ok(Dimensions {
                width: img.width(),
                height: img.height(),
            })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[tokio::test]
    async fn test_decodes_preview_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let preview_dir = dir.path().join("images/preview");
        std::fs::create_dir_all(&preview_dir).unwrap();

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(12, 8);
        img.save(preview_dir.join("wide.png")).unwrap();
        std::fs::write(preview_dir.join("broken.png"), b"not an image").unwrap();

        let decoder = FsPreviewDecoder::new(dir.path());

        let dims = decoder.decode("wide.png").await.unwrap();
        assert_eq!(dims, Dimensions { width: 12, height: 8 });

        let err = decoder.decode("broken.png").await.unwrap_err();
        assert!(matches!(err, DecodeError::Image { .. }));

        assert!(decoder.decode("missing.png").await.is_err());
    }
}

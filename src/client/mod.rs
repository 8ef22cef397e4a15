//! Like client
//!
//! Keeps the local "liked" set and the global counters apart. The local set
//! only picks whether the next toggle is a like or an unlike; counts are
//! always re-read from the server after a toggle goes through.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{info, warn};

use crate::likes::{LikeError, LikeStore};
use crate::server::routes::LikesResponse;
use crate::state::library::LocalLikeSet;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rate limited, try again in a moment")]
    RateLimited,

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid API base url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Store(LikeError),
}

impl From<LikeError> for ApiError {
    fn from(e: LikeError) -> Self {
        match e {
            LikeError::RateLimited => ApiError::RateLimited,
            other => ApiError::Store(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("local like set: {0}")]
    Local(#[from] rusqlite::Error),
}

/// The three like operations, wherever the store lives
#[async_trait]
pub trait LikesApi: Send + Sync {
    async fn get_all(&self) -> Result<BTreeMap<String, u32>, ApiError>;
    async fn increment(&self, key: &str) -> Result<u32, ApiError>;
    async fn decrement(&self, key: &str) -> Result<u32, ApiError>;
}

#[async_trait]
impl LikesApi for LikeStore {
    async fn get_all(&self) -> Result<BTreeMap<String, u32>, ApiError> {
        Ok(LikeStore::get_all(self).await?)
    }

    async fn increment(&self, key: &str) -> Result<u32, ApiError> {
        Ok(LikeStore::increment(self, key).await?)
    }

    async fn decrement(&self, key: &str) -> Result<u32, ApiError> {
        Ok(LikeStore::decrement(self, key).await?)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to a running like server
#[derive(Debug, Clone)]
pub struct HttpLikesApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpLikesApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `<base>/api/likes[/<key>]`, with the key percent-encoded as one segment
    fn likes_url(&self, key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "likes"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl LikesApi for HttpLikesApi {
    async fn get_all(&self) -> Result<BTreeMap<String, u32>, ApiError> {
        let response = self.client.get(self.likes_url(None)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn increment(&self, key: &str) -> Result<u32, ApiError> {
        let response = self.client.post(self.likes_url(Some(key))).send().await?;
        let body: LikesResponse = Self::check(response).await?.json().await?;
        Ok(body.likes)
    }

    async fn decrement(&self, key: &str) -> Result<u32, ApiError> {
        let response = self.client.delete(self.likes_url(Some(key))).send().await?;
        let body: LikesResponse = Self::check(response).await?.json().await?;
        Ok(body.likes)
    }
}

/// Result of a toggle that went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    /// Heart state after the toggle
    pub liked: bool,
    /// Count the server reported for the write
    pub likes: u32,
}

/// Like buttons for one client
pub struct LikeClient<A> {
    api: A,
    local: LocalLikeSet,
    counts: BTreeMap<String, u32>,
}

impl<A: LikesApi> LikeClient<A> {
    pub fn new(api: A, local: LocalLikeSet) -> Self {
        Self {
            api,
            local,
            counts: BTreeMap::new(),
        }
    }

    /// Re-read the global counters
    pub async fn refresh(&mut self) -> Result<&BTreeMap<String, u32>, ApiError> {
        self.counts = self.api.get_all().await?;
        Ok(&self.counts)
    }

    /// Like the image if this client has not liked it yet, unlike it otherwise.
    ///
    /// The local set only changes once the server accepted the write.
    pub async fn toggle(&mut self, key: &str) -> Result<Toggled, ClientError> {
        let was_liked = self.local.is_liked(key)?;

        let likes = if was_liked {
            self.api.decrement(key).await?
        } else {
            self.api.increment(key).await?
        };

        self.local.set_liked(key, !was_liked)?;
        info!(key, liked = !was_liked, likes, "toggled like");

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "failed to refresh like counts");
            self.counts.insert(key.to_string(), likes);
        }

        Ok(Toggled {
            liked: !was_liked,
            likes,
        })
    }

    pub fn is_liked(&self, key: &str) -> Result<bool, rusqlite::Error> {
        self.local.is_liked(key)
    }

    /// Last known global count; 0 for images nobody liked
    pub fn like_count(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    pub fn local(&self) -> &LocalLikeSet {
        &self.local
    }
}

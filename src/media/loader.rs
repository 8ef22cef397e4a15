//! Progressive batch loader
//!
//! Turns the flat manifest into a disclosed list, one batch at a time:
//! - `load_manifest` fetches the identifier list once per session
//! - `load_next_batch` decodes the next `batch_size` previews one after another,
//!   appending each entry as soon as it decodes
//! - when a batch finishes and identifiers remain, a follow-up batch is
//!   scheduled after `batch_interval`
//!
//! A single atomic in-flight flag collapses overlapping triggers (scroll
//! events, the scheduled follow-up) into the batch already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, error, info, warn};

use super::manifest::ManifestProvider;
use super::preview::PreviewDecoder;
use crate::state::data::{Direction, MediaEntry};

/// Tunables for the batch loader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderConfig {
    /// Identifiers attempted per batch
    pub batch_size: usize,
    /// Delay before the automatic follow-up batch
    pub batch_interval: Duration,
    /// Distance in pixels from the bottom of the page that counts as "near the end"
    pub proximity_margin: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            batch_interval: Duration::from_millis(2000),
            proximity_margin: 1000.0,
        }
    }
}

/// What a call to [`BatchLoader::load_next_batch`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A batch ran; `attempted - disclosed` items were skipped
    Loaded { attempted: usize, disclosed: usize },
    /// Another batch was already running
    InFlight,
    /// Nothing left to disclose (or no manifest)
    Exhausted,
}

/// Point-in-time view of the disclosed list, for rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Disclosure {
    pub items: Vec<MediaEntry>,
    /// Number of manifest identifiers attempted so far
    pub cursor: usize,
    pub total: usize,
    pub in_flight: bool,
}

impl Disclosure {
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total
    }

    /// Position of an entry, by manifest filename or like key
    pub fn position(&self, image: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|entry| entry.filename == image || entry.key() == image)
    }

    /// Neighbouring entry for modal navigation; `None` at either end
    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<(usize, &MediaEntry)> {
        let target = match direction {
            Direction::Previous => index.checked_sub(1)?,
            Direction::Next => index.checked_add(1)?,
        };
        self.items.get(target).map(|entry| (target, entry))
    }
}

struct Inner {
    config: LoaderConfig,
    provider: Arc<dyn ManifestProvider>,
    decoder: Arc<dyn PreviewDecoder>,
    manifest: OnceCell<Vec<String>>,
    in_flight: AtomicBool,
    state: watch::Sender<Disclosure>,
}

/// Releases the in-flight flag however the batch ends
struct InFlightGuard<'a> {
    inner: &'a Inner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.send_modify(|s| s.in_flight = false);
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

/// Cheap to clone; clones share the same session
#[derive(Clone)]
pub struct BatchLoader {
    inner: Arc<Inner>,
}

impl BatchLoader {
    pub fn new(
        config: LoaderConfig,
        provider: Arc<dyn ManifestProvider>,
        decoder: Arc<dyn PreviewDecoder>,
    ) -> Self {
        let (state, _) = watch::channel(Disclosure::default());
        Self {
            inner: Arc::new(Inner {
                config: LoaderConfig {
                    batch_size: config.batch_size.max(1),
                    ..config
                },
                provider,
                decoder,
                manifest: OnceCell::new(),
                in_flight: AtomicBool::new(false),
                state,
            }),
        }
    }

    /// Fetch the manifest for this session and return its length.
    ///
    /// Only the first call fetches; concurrent callers wait for that fetch.
    /// A failure is logged and leaves the session with an empty manifest;
    /// it is never retried.
    pub async fn load_manifest(&self) -> usize {
        let inner = &self.inner;
        let list = inner
            .manifest
            .get_or_init(|| async {
                let list = match inner.provider.fetch().await {
                    Ok(manifest) => manifest.dedup().images_list,
                    Err(e) => {
                        error!(error = %e, "failed to load manifest, gallery stays empty");
                        Vec::new()
                    }
                };

                let total = list.len();
                inner.state.send_modify(|s| s.total = total);
                info!(total, "manifest loaded");
                list
            })
            .await;
        list.len()
    }

    /// Load the manifest, then the first batch
    pub async fn start(&self) -> BatchOutcome {
        self.load_manifest().await;
        self.load_next_batch().await
    }

    /// Disclose the next batch, unless one is already running or the
    /// manifest is exhausted.
    pub async fn load_next_batch(&self) -> BatchOutcome {
        let inner = &self.inner;

        if inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("batch already in flight");
            return BatchOutcome::InFlight;
        }
        let guard = InFlightGuard { inner };

        let manifest = inner.manifest.get().map(Vec::as_slice).unwrap_or_default();
        let start = inner.state.borrow().cursor;
        if start >= manifest.len() {
            return BatchOutcome::Exhausted;
        }

        inner.state.send_modify(|s| s.in_flight = true);
        let end = (start + inner.config.batch_size).min(manifest.len());
        let batch = &manifest[start..end];
        debug!(start, end, "loading batch");

        // One decode at a time: the batch never has more than one preview in flight
        let mut disclosed = 0;
        for filename in batch {
            match inner.decoder.decode(filename).await {
                Ok(dimensions) => {
                    let entry = MediaEntry::new(filename, dimensions);
                    inner.state.send_modify(|s| s.items.push(entry));
                    disclosed += 1;
                }
                Err(e) => {
                    warn!(filename = %filename, error = %e, "skipping image");
                }
            }
        }

        let attempted = batch.len();
        inner.state.send_modify(|s| s.cursor = end);
        drop(guard);

        info!(attempted, disclosed, cursor = end, total = manifest.len(), "batch done");

        if end < manifest.len() {
            self.schedule_next_batch();
        }

        BatchOutcome::Loaded {
            attempted,
            disclosed,
        }
    }

    fn schedule_next_batch(&self) {
        let loader = self.clone();
        let delay = self.inner.config.batch_interval;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            loader.load_next_batch().await;
        });
    }

    /// Scroll trigger: load more once the viewport bottom is within
    /// `proximity_margin` of the document end. Returns `None` when too far.
    pub async fn on_scroll(&self, scroll_bottom: f64, document_height: f64) -> Option<BatchOutcome> {
        if scroll_bottom < document_height - self.inner.config.proximity_margin {
            return None;
        }
        Some(self.load_next_batch().await)
    }

    pub fn snapshot(&self) -> Disclosure {
        self.inner.state.borrow().clone()
    }

    /// Receiver that sees every append, cursor move and in-flight change
    pub fn subscribe(&self) -> watch::Receiver<Disclosure> {
        self.inner.state.subscribe()
    }

    pub fn cursor(&self) -> usize {
        self.inner.state.borrow().cursor
    }

    pub fn total(&self) -> usize {
        self.inner.manifest.get().map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("config", &self.inner.config)
            .field("cursor", &self.cursor())
            .field("total", &self.total())
            .finish()
    }
}

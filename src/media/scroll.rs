//! Headless scroll driver
//!
//! Stands in for a reader scrolling the gallery: every tick moves the
//! viewport down and reports the position to the loader's scroll trigger.

use super::loader::{BatchLoader, BatchOutcome};
use crate::state::data::{MediaEntry, ROW_HEIGHT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
        }
    }
}

/// Height of the rendered gallery: tiles laid out left to right at
/// `ROW_HEIGHT`, wrapping whenever a row is full
pub fn document_height(items: &[MediaEntry], viewport_width: f64) -> f64 {
    let mut rows = 0usize;
    let mut row_width = 0.0;

    for basis in items.iter().map(MediaEntry::layout_basis) {
        if rows == 0 || (row_width > 0.0 && row_width + basis > viewport_width) {
            rows += 1;
            row_width = 0.0;
        }
        row_width += basis;
    }

    rows as f64 * ROW_HEIGHT
}

#[derive(Debug)]
pub struct ScrollDriver {
    loader: BatchLoader,
    viewport: Viewport,
    /// Pixels scrolled per tick
    speed: f64,
    position: f64,
}

impl ScrollDriver {
    pub fn new(loader: BatchLoader, viewport: Viewport, speed: f64) -> Self {
        Self {
            loader,
            viewport,
            speed,
            position: 0.0,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Scroll once and fire the proximity trigger
    pub async fn tick(&mut self) -> Option<BatchOutcome> {
        let height = document_height(&self.loader.snapshot().items, self.viewport.width);
        let max_position = (height - self.viewport.height).max(0.0);
        self.position = (self.position + self.speed).min(max_position);

        self.loader
            .on_scroll(self.position + self.viewport.height, height)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::manifest::{Manifest, ManifestError, ManifestProvider};
    use crate::media::preview::{DecodeError, PreviewDecoder};
    use crate::media::LoaderConfig;
    use crate::state::data::Dimensions;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixed(usize);

    #[async_trait]
    impl ManifestProvider for Fixed {
        async fn fetch(&self) -> Result<Manifest, ManifestError> {
            Ok(Manifest::new((0..self.0).map(|i| format!("{i}.jpg")).collect()))
        }
    }

    struct Square;

    #[async_trait]
    impl PreviewDecoder for Square {
        async fn decode(&self, _filename: &str) -> Result<Dimensions, DecodeError> {
            Ok(Dimensions { width: 10, height: 10 })
        }
    }

    fn entry(width: u32, height: u32) -> MediaEntry {
        MediaEntry::new("x.jpg", Dimensions { width, height })
    }

    #[test]
    fn test_rows_wrap_at_viewport_width() {
        // each square tile is 400px wide
        let squares: Vec<_> = (0..5).map(|_| entry(100, 100)).collect();

        assert_eq!(document_height(&[], 1000.0), 0.0);
        assert_eq!(document_height(&squares[..2], 1000.0), 400.0);
        assert_eq!(document_height(&squares, 1000.0), 1200.0);

        // a tile wider than the viewport still gets its own row
        assert_eq!(document_height(&[entry(400, 100), entry(100, 100)], 1000.0), 800.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_at_the_bottom_pulls_the_next_batch() {
        let config = LoaderConfig {
            batch_size: 4,
            batch_interval: Duration::from_secs(3600),
            ..LoaderConfig::default()
        };
        let loader = BatchLoader::new(config, Arc::new(Fixed(10)), Arc::new(Square));
        loader.start().await;

        // 4 squares fill one 1600px row, shorter than the viewport
        let mut driver = ScrollDriver::new(loader.clone(), Viewport::default(), 100.0);
        assert_eq!(
            driver.tick().await,
            Some(BatchOutcome::Loaded {
                attempted: 4,
                disclosed: 4
            })
        );
        assert_eq!(driver.position(), 0.0);

        driver.tick().await;
        assert_eq!(driver.tick().await, Some(BatchOutcome::Exhausted));
        assert_eq!(loader.snapshot().items.len(), 10);
    }
}

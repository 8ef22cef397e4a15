//! Shared data structures for the gallery
//!
//! These structs represent the data model that flows between
//! the batch loader, the like client and the rendering layer.

use serde::{Deserialize, Serialize};

/// Directory holding the small variants the loader decodes
pub const PREVIEW_DIR: &str = "images/preview";
/// Directory holding the variants shown in the modal
pub const MEDIUM_DIR: &str = "images/medium";
/// Directory holding the download variants
pub const FULL_DIR: &str = "images/full";

/// Height of one gallery row, used for the flex-basis hint
pub const ROW_HEIGHT: f64 = 400.0;

/// Intrinsic size of a decoded preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Width over height. A zero height yields 0 instead of infinity.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

/// A single disclosed image
///
/// Created once its preview has been decoded; never mutated afterwards.
/// The preview path doubles as the image key for likes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    /// Filename from the manifest (e.g., "sunset.jpg")
    pub filename: String,
    /// `images/preview/<filename>`
    pub preview: String,
    /// `images/medium/<filename>`
    pub medium: String,
    /// `images/full/<filename>`
    pub full: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
}

impl MediaEntry {
    pub fn new(filename: &str, dimensions: Dimensions) -> Self {
        Self {
            filename: filename.to_string(),
            preview: preview_path(filename),
            medium: format!("{MEDIUM_DIR}/{filename}"),
            full: format!("{FULL_DIR}/{filename}"),
            width: dimensions.width,
            height: dimensions.height,
            aspect_ratio: dimensions.aspect_ratio(),
        }
    }

    /// Canonical key used by the like store and the local like set
    pub fn key(&self) -> &str {
        &self.preview
    }

    /// Flex-basis in pixels so that every tile in a row shares one height
    pub fn layout_basis(&self) -> f64 {
        ROW_HEIGHT * self.aspect_ratio
    }
}

/// Relative path of the preview variant for a manifest identifier
pub fn preview_path(filename: &str) -> String {
    format!("{PREVIEW_DIR}/{filename}")
}

/// Modal navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_derives_all_variants() {
        let entry = MediaEntry::new("a.jpg", Dimensions { width: 800, height: 400 });

        assert_eq!(entry.preview, "images/preview/a.jpg");
        assert_eq!(entry.medium, "images/medium/a.jpg");
        assert_eq!(entry.full, "images/full/a.jpg");
        assert_eq!(entry.key(), "images/preview/a.jpg");
        assert_eq!(entry.aspect_ratio, 2.0);
        assert_eq!(entry.layout_basis(), 800.0);
    }

    #[test]
    fn test_zero_height_has_flat_ratio() {
        let dims = Dimensions { width: 10, height: 0 };
        assert_eq!(dims.aspect_ratio(), 0.0);
    }
}

/// Gallery media module
///
/// This module handles:
/// - Fetching the image manifest
/// - Decoding previews to learn their size
/// - Disclosing the manifest batch by batch
/// - Rebuilding the manifest from the preview directory
/// - Simulating a reader scrolling the gallery

pub mod index;
pub mod loader;
pub mod manifest;
pub mod preview;
pub mod scroll;

pub use loader::{BatchLoader, LoaderConfig};

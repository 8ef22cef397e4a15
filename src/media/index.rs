use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use super::manifest::{Manifest, MANIFEST_PATH};
use crate::state::data::PREVIEW_DIR;

/// Extensions the gallery will list
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Build a manifest from the files in `images/preview`, sorted by name
pub fn scan_previews(gallery_root: &Path) -> Result<Manifest, IndexError> {
    let preview_dir = gallery_root.join(PREVIEW_DIR);
    let mut images = Vec::new();

    for entry in WalkDir::new(&preview_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| IndexError::Walk {
            path: preview_dir.clone(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_image = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
        if !is_image {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => images.push(name.to_string()),
            None => warn!(path = %path.display(), "skipping non UTF-8 filename"),
        }
    }

    images.sort();
    Ok(Manifest::new(images))
}

/// Rescan the previews and rewrite `config/images.json`
pub fn write_manifest(gallery_root: &Path) -> Result<Manifest, IndexError> {
    let manifest = scan_previews(gallery_root)?;
    let path = gallery_root.join(MANIFEST_PATH);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| IndexError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(&path, manifest.to_json()?).map_err(|source| IndexError::Write {
        path: path.clone(),
        source,
    })?;

    info!(count = manifest.len(), path = %path.display(), "manifest updated");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let preview = dir.path().join(PREVIEW_DIR);
        std::fs::create_dir_all(preview.join("nested")).unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.jpeg", "d.gif", "e.webp"] {
            std::fs::write(preview.join(name), b"x").unwrap();
        }
        std::fs::write(preview.join("nested").join("z.jpg"), b"x").unwrap();

        let manifest = write_manifest(dir.path()).unwrap();
        assert_eq!(manifest.images_list, vec!["a.jpg", "b.PNG", "c.jpeg", "d.gif"]);

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_PATH)).unwrap();
        assert_eq!(Manifest::from_json(&written).unwrap(), manifest);
    }

    #[test]
    fn test_missing_preview_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            scan_previews(dir.path()),
            Err(IndexError::Walk { .. })
        ));
    }
}

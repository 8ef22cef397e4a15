use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LikeError {
    #[error("Too many requests, please try again later")]
    RateLimited,

    #[error("Invalid image id: {0:?}")]
    InvalidKey(String),

    #[error("Like table I/O failed on {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LikeError {
    pub(crate) fn storage(path: &std::path::Path, source: std::io::Error) -> Self {
        LikeError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors from the local like database
#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("could not determine user data directory")]
    NoDataDir,

    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

/// The LocalLikeSet records which images *this* client has liked.
///
/// It only decides whether the next toggle is a like or an unlike and
/// drives heart rendering. Global counts always come from the like store;
/// nothing here is ever summed.
pub struct LocalLikeSet {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl LocalLikeSet {
    /// Open the like set in the user's data directory.
    ///
    /// - Linux: ~/.local/share/photo-wall/liked.db
    /// - macOS: ~/Library/Application Support/photo-wall/liked.db
    /// - Windows: %APPDATA%\photo-wall\liked.db
    pub fn new() -> Result<Self, LocalStoreError> {
        let db_path = Self::default_db_path()?;
        Self::open(&db_path)
    }

    /// Open (or create) the like set at an explicit location
    pub fn open(db_path: &Path) -> Result<Self, LocalStoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LocalStoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;
        info!(path = %db_path.display(), "local like set opened");

        let set = LocalLikeSet {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        set.init_schema()?;
        Ok(set)
    }

    /// Non-persistent like set
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, LocalStoreError> {
        let set = LocalLikeSet {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        set.init_schema()?;
        Ok(set)
    }

    /// Location of the backing database, `None` when in memory
    #[cfg(test)]
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn default_db_path() ->Result<PathBuf, LocalStoreError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(LocalStoreError::NoDataDir)?;

        path.push("photo-wall");
        path.push("liked.db");
        Ok(path)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        // One row per liked key; an unliked key has no row
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS liked_images (
                image_key   TEXT PRIMARY KEY,
                liked_at    INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn is_liked(&self, key: &str) -> rusqlite::Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM liked_images WHERE image_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Record the outcome of a successful toggle round-trip
    pub fn set_liked(&self, key: &str, liked: bool) -> rusqlite::Result<()> {
        if liked {
            self.conn.execute(
                "INSERT OR REPLACE INTO liked_images (image_key, liked_at) VALUES (?1, ?2)",
                params![key, Utc::now().timestamp()],
            )?;
        } else {
            self.conn
                .execute("DELETE FROM liked_images WHERE image_key = ?1", [key])?;
        }
        debug!(key, liked, "local like set updated");
        Ok(())
    }

    /// All keys this client has liked, most recent first
    pub fn liked_keys(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT image_key FROM liked_images ORDER BY liked_at DESC, image_key")?;

        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

impl std::fmt::Debug for LocalLikeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLikeSet")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        let set = LocalLikeSet::in_memory().unwrap();
        assert!(!set.is_liked("images/preview/a.jpg").unwrap());

        set.set_liked("images/preview/a.jpg", true).unwrap();
        assert!(set.is_liked("images/preview/a.jpg").unwrap());

        set.set_liked("images/preview/a.jpg", false).unwrap();
        assert!(!set.is_liked("images/preview/a.jpg").unwrap());
        assert!(set.liked_keys().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("liked.db");

        {
            let set = LocalLikeSet::open(&db_path).unwrap();
            set.set_liked("images/preview/b.png", true).unwrap();
            set.set_liked("images/preview/b.png", true).unwrap();
        }

        let reopened = LocalLikeSet::open(&db_path).unwrap();
        assert_eq!(reopened.path(), Some(db_path.as_path()));
        assert_eq!(reopened.liked_keys().unwrap(), vec!["images/preview/b.png"]);
    }
}

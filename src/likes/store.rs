use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cooldown::{CooldownRegistry, Operation};
use super::error::LikeError;
use super::ledger::{self, LikeLedger, HEADER, MAX_LIKES};

/// Settings for the like store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backing table
    pub path: PathBuf,
    /// Minimum gap between two accepted operations of one kind on one key
    pub cooldown: Duration,
    /// Bound on the number of remembered (key, operation) pairs
    pub cooldown_capacity: usize,
    /// Counter ceiling
    pub max_likes: u32,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cooldown: Duration::from_millis(1000),
            cooldown_capacity: 10_000,
            max_likes: MAX_LIKES,
        }
    }
}

/// The global like counters.
///
/// Every mutation runs the full cycle under one lock:
/// cooldown check, read the table, change one row, rewrite the table,
/// record the cooldown. The cooldown is only recorded once the table is on
/// disk, so a storage failure never locks a client out.
#[derive(Debug)]
pub struct LikeStore {
    config: StoreConfig,
    cycle: Mutex<CooldownRegistry>,
}

impl LikeStore {
    /// Open the store, creating a header-only table if none exists
    pub async fn open(config: StoreConfig) -> Result<Self, LikeError> {
        let store = Self {
            cycle: Mutex::new(CooldownRegistry::new(
                config.cooldown,
                config.cooldown_capacity,
            )),
            config,
        };
        store.ensure_table().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    async fn ensure_table(&self) -> Result<(), LikeError> {
        let path = &self.config.path;
        match tokio::fs::metadata(path).await {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(LikeError::storage(path, e)),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LikeError::storage(parent, e))?;
        }
        tokio::fs::write(path, format!("{HEADER}\n"))
            .await
            .map_err(|e| LikeError::storage(path, e))?;

        info!(path = %path.display(), "created like table");
        Ok(())
    }

    async fn read_ledger(&self) -> Result<LikeLedger, LikeError> {
        let path = &self.config.path;
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(LikeLedger::parse(&text, self.config.max_likes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "like table missing, treating as empty");
                Ok(LikeLedger::new())
            }
            Err(e) => Err(LikeError::storage(path, e)),
        }
    }

    /// Rewrite the whole table through a sibling file and an atomic rename
    async fn write_ledger(&self, ledger: &LikeLedger) -> Result<(), LikeError> {
        let path = &self.config.path;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| LikeError::storage(&tmp, e))?;
        file.write_all(ledger.render().as_bytes())
            .await
            .map_err(|e| LikeError::storage(&tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| LikeError::storage(&tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| LikeError::storage(path, e))?;
        Ok(())
    }

    /// Every key with its counter, as currently persisted
    pub async fn get_all(&self) -> Result<BTreeMap<String, u32>, LikeError> {
        Ok(self.read_ledger().await?.to_map())
    }

    /// Add one like to `key` and return the new count
    pub async fn increment(&self, key: &str) -> Result<u32, LikeError> {
        self.mutate(key, Operation::Like).await
    }

    /// Remove one like from `key` and return the new count (0 if never liked)
    pub async fn decrement(&self, key: &str) -> Result<u32, LikeError> {
        self.mutate(key, Operation::Unlike).await
    }

    async fn mutate(&self, key: &str, op: Operation) -> Result<u32, LikeError> {
        ledger::validate_key(key)?;

        let mut cooldowns = self.cycle.lock().await;
        let now = Instant::now();
        if !cooldowns.is_allowed(key, op, now) {
            warn!(key, op = op.as_str(), "rate limited");
            return Err(LikeError::RateLimited);
        }

        let mut ledger = self.read_ledger().await?;
        let likes = match op {
            Operation::Like => Some(ledger.increment(key, self.config.max_likes)),
            Operation::Unlike => ledger.decrement(key),
        };

        let likes = match likes {
            Some(likes) => {
                self.write_ledger(&ledger).await?;
                likes
            }
            // unliking an image nobody liked: nothing to persist
            None => 0,
        };

        cooldowns.record(key, op, now);
        debug!(key, op = op.as_str(), likes, "like table updated");
        Ok(likes)
    }
}

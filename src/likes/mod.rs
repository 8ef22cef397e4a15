/// Like counter module
///
/// This module handles:
/// - The persisted like table format (ledger.rs)
/// - Per-key write cooldowns (cooldown.rs)
/// - The serialized read-modify-write store (store.rs)

pub mod cooldown;
pub mod error;
pub mod ledger;
pub mod store;

pub use error::LikeError;
pub use store::{LikeStore, StoreConfig};

//! Command line and environment configuration
//!
//! Every setting can come from a flag or a `PHOTO_WALL_*` environment
//! variable; anything unset falls back to the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::likes::ledger::MAX_LIKES;
use crate::likes::StoreConfig;
use crate::media::scroll::Viewport;
use crate::media::LoaderConfig;

/// Photo wall: progressive gallery loading and shared like counters
#[derive(Parser, Debug)]
#[command(name = "photo-wall", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the like counter server
    Serve(ServeArgs),
    /// Load a gallery batch by batch and report what gets disclosed
    Browse(BrowseArgs),
    /// Rebuild config/images.json from images/preview
    Index(IndexArgs),
    /// Like an image, or unlike it if this client already liked it
    Toggle(ToggleArgs),
    /// Show global like counts and this client's hearts
    Likes(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "PHOTO_WALL_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Like table location
    #[arg(long, env = "PHOTO_WALL_LIKES_FILE", default_value = "likes.csv")]
    pub likes_file: PathBuf,

    /// Minimum gap between two accepted likes (or unlikes) of one image
    #[arg(long, env = "PHOTO_WALL_COOLDOWN_MS", default_value_t = 1000)]
    pub cooldown_ms: u64,

    /// Most (image, operation) pairs the cooldown registry remembers
    #[arg(long, env = "PHOTO_WALL_COOLDOWN_CAPACITY", default_value_t = 10_000)]
    pub cooldown_capacity: usize,

    #[arg(long, env = "PHOTO_WALL_MAX_LIKES", default_value_t = MAX_LIKES)]
    pub max_likes: u32,
}

impl ServeArgs {
    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig {
            cooldown: Duration::from_millis(self.cooldown_ms),
            cooldown_capacity: self.cooldown_capacity,
            max_likes: self.max_likes,
            ..StoreConfig::new(&self.likes_file)
        };
        info!(
            path = %config.path.display(),
            cooldown_ms = self.cooldown_ms,
            capacity = config.cooldown_capacity,
            max_likes = config.max_likes,
            "like store configured"
        );
        config
    }
}

#[derive(Args, Debug, Clone)]
#[group(id = "source", required = true, multiple = false)]
pub struct GallerySource {
    /// Gallery directory holding config/ and images/
    #[arg(long, env = "PHOTO_WALL_ROOT")]
    pub root: Option<PathBuf>,

    /// Base URL of a server hosting the gallery
    #[arg(long, env = "PHOTO_WALL_GALLERY_URL")]
    pub url: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub source: GallerySource,

    #[arg(long, env = "PHOTO_WALL_BATCH_SIZE", default_value_t = 15)]
    pub batch_size: usize,

    /// Delay before the next batch is loaded on its own
    #[arg(long, env = "PHOTO_WALL_BATCH_INTERVAL_MS", default_value_t = 2000)]
    pub batch_interval_ms: u64,

    /// How close to the bottom (px) a scroll must get to trigger loading
    #[arg(long, env = "PHOTO_WALL_PROXIMITY", default_value_t = 1000.0)]
    pub proximity: f64,

    /// Simulate a reader scrolling this many pixels every tick
    #[arg(long)]
    pub scroll_speed: Option<f64>,

    #[arg(long, default_value_t = 250)]
    pub scroll_tick_ms: u64,

    /// Print the disclosed list as JSON when done
    #[arg(long)]
    pub json: bool,

    /// Once loaded, open this image (filename or key) as the modal would
    #[arg(long, value_name = "IMAGE")]
    pub open: Option<String>,
}

impl BrowseArgs {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            batch_interval: Duration::from_millis(self.batch_interval_ms),
            proximity_margin: self.proximity,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::default()
    }
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Gallery directory holding images/preview
    #[arg(long, env = "PHOTO_WALL_ROOT", default_value = ".")]
    pub root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the like server
    #[arg(long, env = "PHOTO_WALL_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// Local like database (defaults to the user data directory)
    #[arg(long, env = "PHOTO_WALL_LOCAL_DB")]
    pub local_db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Image key (`images/preview/<file>`) or bare filename
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["photo-wall", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let config = args.store_config();
        assert_eq!(config.cooldown, Duration::from_millis(1000));
        assert_eq!(config.max_likes, 99_999);
        assert_eq!(config.path, PathBuf::from("likes.csv"));
    }

    #[test]
    fn test_browse_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["photo-wall", "browse"]).is_err());
        assert!(Cli::try_parse_from(["photo-wall", "browse", "--root", "a", "--url", "http://b"]).is_err());

        let cli = Cli::try_parse_from(["photo-wall", "browse", "--root", "gallery"]).unwrap();
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };
        assert_eq!(args.loader_config(), LoaderConfig::default());
        assert_eq!(args.open, None);

        let cli = Cli::try_parse_from(["photo-wall", "browse", "--url", "http://b", "--open", "a.jpg"]).unwrap();
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };
        assert_eq!(args.open.as_deref(), Some("a.jpg"));
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

mod client;
mod config;
mod likes;
mod media;
mod server;
mod state;

use client::{HttpLikesApi, LikeClient};
use config::{BrowseArgs, Cli, ClientArgs, Command, IndexArgs, ServeArgs, ToggleArgs};
use likes::LikeStore;
use media::manifest::{FsManifestProvider, HttpManifestProvider, ManifestProvider};
use media::preview::{FsPreviewDecoder, HttpPreviewDecoder, PreviewDecoder};
use media::scroll::ScrollDriver;
use media::loader::Disclosure;
use media::BatchLoader;
use state::data::{preview_path, Direction, PREVIEW_DIR};
use state::library::LocalLikeSet;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Browse(args) => browse(args).await,
        Command::Index(args) => index(args),
        Command::Toggle(args) => toggle(args).await,
        Command::Likes(args) => show_likes(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    info!("Initializing like store...");
    let store = LikeStore::open(args.store_config())
        .await
        .context("failed to open like table")?;
    info!(path = %store.path().display(), "like store ready");

    server::serve(Arc::new(store), args.port).await
}

async fn browse(args: BrowseArgs) -> Result<()> {
    let provider: Arc<dyn ManifestProvider>;
    let decoder: Arc<dyn PreviewDecoder>;
    if let Some(root) = &args.source.root {
        provider = Arc::new(FsManifestProvider::new(root));
        decoder = Arc::new(FsPreviewDecoder::new(root));
    } else if let Some(url) = &args.source.url {
        provider = Arc::new(HttpManifestProvider::new(url)?);
        decoder = Arc::new(HttpPreviewDecoder::new(url)?);
    } else {
        anyhow::bail!("either --root or --url is required");
    }

    let loader = BatchLoader::new(args.loader_config(), provider, decoder);
    let mut progress = loader.subscribe();
    let mut driver = args
        .scroll_speed
        .map(|speed| ScrollDriver::new(loader.clone(), args.viewport(), speed));
    let mut ticker = tokio::time::interval(Duration::from_millis(args.scroll_tick_ms.max(1)));

    loader.start().await;

    let mut shown = 0;
    loop {
        let done = {
            let snapshot = progress.borrow_and_update();
            for (index, entry) in snapshot.items.iter().enumerate().skip(shown) {
                info!(
                    index,
                    key = entry.key(),
                    width = entry.width,
                    height = entry.height,
                    basis = entry.layout_basis(),
                    "disclosed"
                );
            }
            shown = snapshot.items.len();
            snapshot.is_complete() && !snapshot.in_flight
        };
        if done {
            break;
        }

        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick(), if driver.is_some() => {
                if let Some(driver) = driver.as_mut() {
                    let outcome = driver.tick().await;
                    debug!(position = driver.position(), ?outcome, "scrolled");
                }
            }
        }
    }

    let snapshot = loader.snapshot();
    info!(
        disclosed = snapshot.items.len(),
        attempted = snapshot.cursor,
        total = snapshot.total,
        "gallery fully loaded"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    if let Some(image) = &args.open {
        open_modal(&snapshot, image)?;
    }
    Ok(())
}

/// Print what the modal shows for one image: its larger variants and the
/// entries the previous/next buttons lead to
fn open_modal(snapshot: &Disclosure, image: &str) -> Result<()> {
    let index = snapshot
        .position(image)
        .with_context(|| format!("{image} is not in the gallery"))?;
    let entry = &snapshot.items[index];

    println!("{} ({}x{})", entry.filename, entry.width, entry.height);
    println!("  medium:   {}", entry.medium);
    println!("  full:     {}", entry.full);
    for (label, direction) in [("previous", Direction::Previous), ("next", Direction::Next)] {
        match snapshot.neighbor(index, direction) {
            Some((_, neighbor)) => println!("  {label:<9} {}", neighbor.filename),
            None => println!("  {label:<9} -"),
        }
    }
    Ok(())
}

fn index(args: IndexArgs) -> Result<()> {
    let manifest = media::index::write_manifest(&args.root)
        .with_context(|| format!("failed to index {}", args.root.display()))?;
    println!("{} images listed", manifest.len());
    Ok(())
}

fn like_client(args: &ClientArgs) -> Result<LikeClient<HttpLikesApi>> {
    let api = HttpLikesApi::new(&args.api_url)?;
    let local = match &args.local_db {
        Some(path) => LocalLikeSet::open(path),
        None => LocalLikeSet::new(),
    }
    .context("failed to open local like set")?;
    Ok(LikeClient::new(api, local))
}

async fn toggle(args: ToggleArgs) -> Result<()> {
    let mut client = like_client(&args.client)?;

    let key = if args.image.starts_with(&format!("{PREVIEW_DIR}/")) {
        args.image.clone()
    } else {
        preview_path(&args.image)
    };

    let toggled = client.toggle(&key).await?;
    let heart = if toggled.liked { "♥" } else { "♡" };
    println!("{heart} {key} ({} likes)", client.like_count(&key));
    Ok(())
}

async fn show_likes(args: ClientArgs) -> Result<()> {
    let mut client = like_client(&args)?;
    client.refresh().await?;

    for (key, count) in client.counts() {
        let heart = if client.is_liked(key)? { "♥" } else { " " };
        println!("{heart} {count:>5} {key}");
    }

    // liked here, but the server has no row (e.g. its table was reset)
    for key in client.local().liked_keys()? {
        if !client.counts().contains_key(&key) {
            println!("♥ {:>5} {key}", "?");
        }
    }
    Ok(())
}

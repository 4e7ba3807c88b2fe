use std::sync::Arc;

use arttok_core::collection::LikedCollection;
use arttok_core::config::Config;
use arttok_core::feed::{FeedEngine, FetchOutcome};
use arttok_core::harvard::HarvardClient;
use arttok_core::liked::{spawn_external_watcher, LikedFileStorage, LikedStore};
use clap::{Parser, Subcommand};
use tracing::error;

/// arttok headless shell — drives the art feed without a graphical UI.
#[derive(Parser)]
#[command(name = "arttok")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and print feed pages.
    Feed {
        /// Number of pages to fetch.
        #[arg(long, default_value = "1")]
        pages: u32,
    },
    /// Toggle the liked state of an artwork id.
    Like { id: i64 },
    /// Print the liked collection against the loaded feed.
    Liked {
        /// Pages to load before deriving the collection.
        #[arg(long, default_value = "1")]
        pages: u32,
        /// Keep running and reprint when another process changes the set.
        #[arg(long)]
        watch: bool,
    },
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn feed_engine(config: &Config) -> FeedEngine {
    let catalog = Arc::new(HarvardClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
    ));
    FeedEngine::new(catalog, config.page_size)
}

async fn load_pages(engine: &FeedEngine, pages: u32) {
    for _ in 0..pages {
        match engine.fetch_next_page().await {
            FetchOutcome::Fetched(_) => {}
            // The feed carries its own error state; stop paging either way.
            _ => break,
        }
    }
}

fn print_feed(engine: &FeedEngine, store: &LikedStore) {
    let state = engine.snapshot();
    for piece in &state.pieces {
        let heart = if store.is_liked(piece.id) { "♥" } else { " " };
        println!("{} {:>8}  {} by {}", heart, piece.id, piece.title, piece.artist);
    }
    if let Some(message) = &state.last_error {
        println!("{message}");
    } else if !state.has_more {
        println!("You're all caught up for now!");
    }
}

fn print_collection(collection: &LikedCollection) {
    if collection.pieces.is_empty() {
        println!("No liked artworks loaded.");
    } else {
        println!("Liked art:");
        for piece in &collection.pieces {
            println!("  {:>8}  {} by {}", piece.id, piece.title, piece.artist);
        }
    }
    match collection.missing_count {
        0 => {}
        1 => println!("One liked artwork isn't loaded in this feed yet."),
        missing => println!("{missing} liked artworks aren't loaded in this feed yet."),
    }
}

#[tokio::main]
async fn main() {
    configure_logging();
    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let storage = Arc::new(LikedFileStorage::new(&config.app_dir));
    let store = LikedStore::new(storage.clone());

    match args.command {
        Command::Feed { pages } => {
            let engine = feed_engine(&config);
            load_pages(&engine, pages).await;
            print_feed(&engine, &store);
        }
        Command::Like { id } => {
            let liked = store.toggle_like(id);
            println!("{} artwork {}", if liked { "Liked" } else { "Unliked" }, id);
        }
        Command::Liked { pages, watch } => {
            let engine = feed_engine(&config);
            load_pages(&engine, pages).await;
            print_collection(&LikedCollection::derive_from(&engine, &store));

            if watch {
                let mut rx = store.subscribe();
                let _watcher = spawn_external_watcher(storage, store.clone());
                println!("Watching for changes; press Ctrl-C to stop.");
                while rx.recv().await.is_ok() {
                    print_collection(&LikedCollection::derive_from(&engine, &store));
                }
            }
        }
    }
}

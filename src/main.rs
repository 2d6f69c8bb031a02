use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spotdl_resolve::catalog::Catalog;
use spotdl_resolve::config::{Settings, DEFAULT_THREADS};
use spotdl_resolve::manifest::write_manifest;
use spotdl_resolve::progress::{format_duration, set_log_only};
use spotdl_resolve::query::QueryResolver;
use spotdl_resolve::scoring::AudioMatcher;

#[derive(Parser)]
#[command(name = "spotdl-resolve")]
#[command(about = "Resolve track, collection and search queries to playable media URLs")]
struct Args {
    /// JSON catalog with track metadata, collections and search results
    catalog: PathBuf,

    /// Track/playlist/album/artist URLs, `saved`, `.spotdl` files,
    /// `YouTubeURL|SpotifyURL` pairs or free-text searches
    #[arg(required = true)]
    queries: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Search-query template, e.g. "{artist} - {title} (audio)"
    #[arg(long)]
    search_query: Option<String>,

    /// Take the first search result instead of scoring candidates
    #[arg(long)]
    filter_results: bool,

    /// Write the resolved songs to a .spotdl manifest
    #[arg(long)]
    save: Option<PathBuf>,

    /// Hide progress bars, log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spotdl_resolve=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        threads: args.threads,
        search_query: args.search_query,
        filter_results: args.filter_results,
        log_only: args.log_only,
    };
    set_log_only(settings.log_only);

    let start = Instant::now();

    let catalog = Catalog::from_file(&args.catalog)
        .with_context(|| format!("Failed to load catalog {:?}", args.catalog))?;

    let resolver = QueryResolver::from_settings(&catalog, &settings);
    let resolved = resolver
        .resolve(args.queries.as_slice())
        .context("Failed to resolve query")?;

    for failure in &resolved.failures {
        warn!("Skipped {}: {}", failure.url, failure.error);
    }

    if let Some(path) = &args.save {
        write_manifest(path, &resolved.songs)
            .with_context(|| format!("Failed to save manifest {:?}", path))?;
        info!("Saved {} songs to {:?}", resolved.songs.len(), path);
    }

    let matcher = AudioMatcher::from_settings(&catalog, &settings);
    let outcomes = matcher
        .match_all(resolved.songs, settings.worker_count())
        .context("Failed to match songs")?;

    for outcome in &outcomes {
        match &outcome.download_url {
            Some(url) => println!("{} -> {}", outcome.song.display_name(), url),
            None => println!("{} -> no match", outcome.song.display_name()),
        }
    }

    info!("Done in {}", format_duration(start.elapsed()));
    Ok(())
}

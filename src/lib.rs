//! apod-cache - Astronomy Picture of the Day cache
//!
//! Fetches NASA's Astronomy Picture of the Day for a date, stores each
//! distinct image exactly once in a content-addressed local cache (SHA-256
//! keyed, SQLite indexed) and optionally applies it as desktop background.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod progress;
pub mod wallpaper;

use anyhow::{Context, Result};
use yansi::Paint;

use crate::api::ApodClient;
use crate::cache::hasher::fingerprint_file;
use crate::cache::{CacheCoordinator, CacheOutcome};
use crate::cli::{Cli, Commands, ListArgs, ShowArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::fetch::HttpFetcher;
use crate::progress::Progress;
use crate::wallpaper::{SystemWallpaper, WallpaperSetter};

/// Run the application for parsed command-line arguments.
///
/// Logging must already be initialized.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if cli.global.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.global.config.as_deref())?.apply_overrides(cli.overrides());
    let settings = config.cache_settings()?;
    let cache = CacheCoordinator::open(&settings).context("Failed to open the image cache")?;

    match &cli.command {
        Some(Commands::List(args)) => list(&cache, args),
        Some(Commands::Show(args)) => show(&cache, args),
        None => {
            let progress = Progress::new(cli.global.quiet);
            let source = ApodClient::new(&config.api_url, &config.api_key, config.timeout())?;
            let fetcher = HttpFetcher::new(config.timeout(), progress)?;
            let date = cli.date_or_today();

            let outcome = cache
                .add_apod(date, &source, &fetcher)
                .with_context(|| format!("Failed to cache the APOD for {date}"))?;

            let wallpaper = config.set_wallpaper.then(SystemWallpaper::new);
            finish_fetch(
                &cache,
                outcome,
                wallpaper.as_ref().map(|w| w as &dyn WallpaperSetter),
            )
        }
    }
}

/// Resolve the cached entry and hand its file to the wallpaper setter.
///
/// A wallpaper failure is reported but does not fail the run: the image is
/// cached either way.
pub fn finish_fetch(
    cache: &CacheCoordinator,
    outcome: CacheOutcome,
    wallpaper: Option<&dyn WallpaperSetter>,
) -> Result<ExitCode> {
    let entry = cache
        .entry(outcome.id())?
        .with_context(|| format!("Cache entry {} vanished after caching", outcome.id()))?;

    let status = if outcome.is_hit() { "cached" } else { "new" };
    println!(
        "{} [{}] {}",
        entry.id.bold(),
        status.cyan(),
        entry.title
    );
    println!("{}", entry.file_path.display());

    if let Some(setter) = wallpaper {
        match setter.set_wallpaper(&entry.file_path) {
            Ok(()) => println!("Desktop background {}", "set".green()),
            Err(e) => {
                log::warn!("Could not set desktop background: {}", e);
                println!("Desktop background {}", "not set".red());
            }
        }
    }

    Ok(ExitCode::Success)
}

fn list(cache: &CacheCoordinator, args: &ListArgs) -> Result<ExitCode> {
    if args.json {
        let entries = cache.entries()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        let titles = cache.titles()?;
        if titles.is_empty() {
            log::info!("The image cache is empty");
        }
        for title in titles {
            println!("{title}");
        }
    }
    Ok(ExitCode::Success)
}

fn show(cache: &CacheCoordinator, args: &ShowArgs) -> Result<ExitCode> {
    let entry = cache
        .entry(args.id)?
        .with_context(|| format!("No cached entry with id {}", args.id))?;

    println!("{}", entry.title.bold());
    println!("Date: {}", entry.date);
    println!("File: {}", entry.file_path.display());
    println!("SHA-256: {}", entry.content_hash);

    match fingerprint_file(&entry.file_path) {
        Ok(hash) if hash == entry.content_hash => println!("Integrity: {}", "ok".green()),
        Ok(hash) => {
            log::warn!("{} now hashes to {}", entry.file_path.display(), hash);
            println!("Integrity: {}", "modified".red());
        }
        Err(e) => {
            log::warn!("Cannot read {}: {}", entry.file_path.display(), e);
            println!("Integrity: {}", "missing".red());
        }
    }
    println!();
    println!("{}", entry.explanation);
    Ok(ExitCode::Success)
}

//! Command-line interface definitions for apod-cache.
//!
//! # Example
//!
//! ```bash
//! # Cache today's picture and set it as wallpaper
//! apod-cache
//!
//! # Cache a specific day without touching the desktop
//! apod-cache 2022-05-01 --no-wallpaper
//!
//! # List everything in the cache
//! apod-cache list
//! ```

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::api::FIRST_APOD_DATE;
use crate::cache::RecordId;
use crate::config::Overrides;

/// Downloads NASA's Astronomy Picture of the Day into a local cache.
///
/// Each distinct image is stored once, keyed by the SHA-256 of its bytes,
/// and can be applied as the desktop background.
#[derive(Debug, Parser)]
#[command(name = "apod-cache")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// APOD date (YYYY-MM-DD); defaults to today
    #[arg(value_name = "DATE", value_parser = parse_apod_date)]
    pub date: Option<NaiveDate>,

    /// Cache the image but do not set it as desktop background
    #[arg(long)]
    pub no_wallpaper: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Directory holding cached images and the metadata database
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// NASA API key (defaults to DEMO_KEY)
    #[arg(long, value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print errors as JSON objects
    #[arg(long, global = true)]
    pub json_errors: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the titles of all cached images
    List(ListArgs),
    /// Show one cached entry by its record id
    Show(ShowArgs),
}

/// Arguments for the list subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print full entries as JSON instead of titles
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the show subcommand.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Record id as printed when the image was cached
    #[arg(value_name = "ID")]
    pub id: RecordId,
}

impl Cli {
    /// Config values supplied on the command line.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            cache_dir: self.global.cache_dir.clone(),
            api_key: self.global.api_key.clone(),
            no_wallpaper: self.no_wallpaper,
        }
    }

    /// Requested date, or today's local date.
    #[must_use]
    pub fn date_or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Parse and validate an APOD date against today's local date.
pub fn parse_apod_date(s: &str) -> Result<NaiveDate, String> {
    validate_apod_date(s, Local::now().date_naive())
}

/// Parse a `YYYY-MM-DD` date that must lie between the first APOD and
/// `today`, inclusive.
pub fn validate_apod_date(s: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let s = s.trim();
    let shape_ok = s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !shape_ok {
        return Err(format!("Invalid date format '{s}', expected YYYY-MM-DD"));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{s}': {e}"))?;

    if date > today {
        return Err(format!("APOD date {date} cannot be in the future"));
    }
    if date < FIRST_APOD_DATE {
        return Err(format!(
            "APOD date {date} is before the first APOD ({FIRST_APOD_DATE})"
        ));
    }
    Ok(date)
}

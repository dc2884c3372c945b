//! Download progress reporting using indicatif.
//!
//! Only the image download is long enough to deserve a progress bar. When
//! the server sends a `Content-Length` the bar shows bytes and throughput,
//! otherwise it falls back to a spinner with a byte counter.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

/// Factory for progress bars that respects `--quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, every bar is created hidden.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// A reporter that never draws anything.
    #[must_use]
    pub fn hidden() -> Self {
        Self::new(true)
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Create a bar for a download of `total` bytes (if known).
    #[must_use]
    pub fn download_bar(&self, total: Option<u64>, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr());
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_message(message.to_string());
        bar
    }
}

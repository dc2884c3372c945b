//! Desktop background integration.
//!
//! Setting the wallpaper is a side effect applied after the cache has
//! resolved a file; the cache itself never calls into this module.
//!
//! Each platform is handled by shelling out to the tool the desktop already
//! ships with:
//!
//! - **Linux (GNOME)**: `gsettings set org.gnome.desktop.background picture-uri`
//! - **macOS**: `osascript` telling System Events to set every desktop's picture
//! - **Windows**: `reg add` of the `Wallpaper` value plus a `RUNDLL32` refresh

use std::path::{Path, PathBuf};
use std::process::Command;

use reqwest::Url;
use thiserror::Error;

/// Error type for wallpaper operations.
#[derive(Debug, Error)]
pub enum WallpaperError {
    /// The image to apply does not exist.
    #[error("wallpaper image not found: {0}")]
    MissingFile(PathBuf),

    /// No known way to set the wallpaper on this platform.
    #[error("setting the desktop background is not supported on this platform")]
    Unsupported,

    /// The helper program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper program ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Applies an image file as the desktop background.
pub trait WallpaperSetter {
    fn set_wallpaper(&self, path: &Path) -> Result<(), WallpaperError>;
}

/// Desktop families we know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Unsupported,
}

impl Platform {
    /// Platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else if cfg!(unix) {
            Self::Linux
        } else {
            Self::Unsupported
        }
    }
}

/// One external command in a wallpaper plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Whether a failure of this step fails the whole operation.
    pub required: bool,
}

impl PlannedCommand {
    fn new(program: &str, args: &[&str], required: bool) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            required,
        }
    }
}

/// Percent-encoded `file://` URI for `path`. Relative paths, which have no
/// URI form, are passed through verbatim.
fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(String::from)
        .unwrap_or_else(|()| format!("file://{}", path.to_string_lossy()))
}

/// Commands that set `path` as the wallpaper on `platform`, in order.
#[must_use]
pub fn plan(platform: Platform, path: &Path) -> Vec<PlannedCommand> {
    let display = path.to_string_lossy();
    match platform {
        Platform::Linux => {
            let uri = file_uri(path);
            vec![
                PlannedCommand::new(
                    "gsettings",
                    &["set", "org.gnome.desktop.background", "picture-uri", uri.as_str()],
                    true,
                ),
                // Only exists on GNOME 42+.
                PlannedCommand::new(
                    "gsettings",
                    &["set", "org.gnome.desktop.background", "picture-uri-dark", uri.as_str()],
                    false,
                ),
            ]
        }
        Platform::MacOs => {
            let escaped = display.replace('\\', "\\\\").replace('"', "\\\"");
            let script = format!(
                "tell application \"System Events\" to tell every desktop to set picture to \"{escaped}\""
            );
            vec![PlannedCommand::new("osascript", &["-e", script.as_str()], true)]
        }
        Platform::Windows => vec![
            PlannedCommand::new(
                "reg",
                &[
                    "add",
                    r"HKCU\Control Panel\Desktop",
                    "/v",
                    "Wallpaper",
                    "/t",
                    "REG_SZ",
                    "/d",
                    display.as_ref(),
                    "/f",
                ],
                true,
            ),
            PlannedCommand::new(
                "RUNDLL32.EXE",
                &["user32.dll,UpdatePerUserSystemParameters"],
                false,
            ),
        ],
        Platform::Unsupported => Vec::new(),
    }
}

/// [`WallpaperSetter`] that runs the platform's own tooling.
#[derive(Debug, Clone, Copy)]
pub struct SystemWallpaper {
    platform: Platform,
}

impl SystemWallpaper {
    #[must_use]
    pub fn new() -> Self {
        Self::for_platform(Platform::current())
    }

    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        Self { platform }
    }

    fn run(command: &PlannedCommand) -> Result<(), WallpaperError> {
        log::debug!("Running {} {:?}", command.program, command.args);
        let output = Command::new(&command.program)
            .args(&command.args)
            .output()
            .map_err(|source| WallpaperError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(WallpaperError::CommandFailed {
                program: command.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for SystemWallpaper {
    fn default() -> Self {
        Self::new()
    }
}

impl WallpaperSetter for SystemWallpaper {
    fn set_wallpaper(&self, path: &Path) -> Result<(), WallpaperError> {
        if !path.is_file() {
            return Err(WallpaperError::MissingFile(path.to_path_buf()));
        }

        let commands = plan(self.platform, path);
        if commands.is_empty() {
            return Err(WallpaperError::Unsupported);
        }

        for command in &commands {
            match Self::run(command) {
                Ok(()) => {}
                Err(e) if !command.required => {
                    log::debug!("Optional wallpaper step failed: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

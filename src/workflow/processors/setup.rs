//! Setup/initialization - application startup tasks
//!
//! Includes:
//! - FFmpeg availability check
//! - Storage folder initialization
//! - Logger initialization

use env_logger::{Builder, Env};
use log::{error, info};
use std::io::Write;
use std::process::Command;

use crate::common::UPLOAD_STAGING_FOLDER_NAME;
use crate::config::APP_CONFIG;

// ────────────────────────────────────────────────────────────────
// FFmpeg Check
// ────────────────────────────────────────────────────────────────

/// Check if ffmpeg is available in PATH; frame extraction cannot work
/// without it, but the server still starts so the failure is visible per
/// job rather than as a crash loop.
pub fn check_ffmpeg() {
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version_info = String::from_utf8_lossy(&output.stdout);
            let version_number = version_info
                .lines()
                .next()
                .unwrap_or("Unknown version")
                .split_whitespace()
                .nth(2)
                .unwrap_or("Unknown");
            info!("ffmpeg version: {}", version_number);
        }
        Ok(_) => {
            error!(
                "`ffmpeg` command was found, but it returned an error. Please ensure it's correctly installed."
            );
        }
        Err(_) => {
            error!(
                "`ffmpeg` is not installed or not available in PATH. Please install it before running the application."
            );
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Folder Initialization
// ────────────────────────────────────────────────────────────────

/// Create the storage root and the staging area uploads land in before
/// admission moves them into a job's subtree.
pub fn initialize_folder() {
    std::fs::create_dir_all(APP_CONFIG.storage_root.join(UPLOAD_STAGING_FOLDER_NAME))
        .expect("Failed to create storage root");
}

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

/// Compact single-line log format; `RUST_LOG` overrides the default level.
pub fn initialize_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {} {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

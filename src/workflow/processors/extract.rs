//! Frame extraction - turns the stored video into a numbered frame sequence
//!
//! The ffmpeg CLI does the heavy lifting: it is more efficient than decoding
//! video in-process and keeps container/codec handling out of this crate.

use anyhow::{Context, Result, anyhow};
use log::debug;
use std::process::Command;
use tokio::task::spawn_blocking;

use crate::common::FRAME_FILENAME_PATTERN;
use crate::models::job::MediaJob;

/// Populate the job's frame directory from its video file, one JPEG per
/// frame numbered from 0 (`frames_0.jpg`, `frames_1.jpg`, ...).
///
/// Strictly pass/fail with no partial-progress signal: on error the
/// directory contents are undefined and the caller must not assume any
/// frames were written.
pub async fn extract_frames(job: &MediaJob) -> Result<()> {
    debug!("attempting to extract frames from video id: {}", job.id);

    let video_path = job.layout.video_path.clone();
    let frame_pattern = job.layout.frames_path.join(FRAME_FILENAME_PATTERN);

    spawn_blocking(move || {
        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(&video_path)
            .args(["-f", "image2", "-start_number", "0", "-q:v", "0"])
            .arg(&frame_pattern)
            .output()
            .with_context(|| format!("failed to spawn ffmpeg for {:?}", video_path))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "ffmpeg failed for {:?} with status code {:?}: {}",
                video_path,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr)
            ))
        }
    })
    .await
    .context("frame extraction task panicked")?
}

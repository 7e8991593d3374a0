//! Frame conversion - the bounded grayscale engine
//!
//! Includes:
//! - Frame enumeration from a job's frame directory
//! - Semaphore-bounded fan-out of per-frame conversion tasks
//! - Grayscale traversal and JPEG re-encoding at fixed quality

use anyhow::{Context, Result};
use futures::future::join_all;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use log::{debug, error, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use crate::common::OUTPUT_JPEG_QUALITY;
use crate::config::APP_CONFIG;
use crate::models::job::MediaJob;

// ────────────────────────────────────────────────────────────────
// Conversion Engine
// ────────────────────────────────────────────────────────────────

/// Convert every extracted frame of the job to grayscale, writing each
/// result under the job's output directory with the filename unchanged, so
/// the final directory contents are independent of completion order.
///
/// At most `max_concurrent_conversions` frames are in flight at once, which
/// bounds peak memory and open file descriptors independent of video
/// length; the call returns only once every frame task has finished. A
/// single frame's failure is logged and swallowed - only a failure to
/// enumerate the frame directory is reported to the caller.
pub async fn convert_frames(job: &MediaJob) -> Result<()> {
    let start_time = Instant::now();

    let frames = enumerate_frames(&job.layout.frames_path)
        .with_context(|| format!("failed to retrieve images for video id: {}", job.id))?;
    let frame_count = frames.len();
    debug!(
        "attempting to convert {} frames for video id: {}",
        frame_count, job.id
    );

    let job_id = job.id;
    let output_path = job.layout.output_path.clone();
    let failed = run_bounded(
        frames,
        APP_CONFIG.max_concurrent_conversions,
        move |(frame_no, frame_path): (usize, PathBuf)| {
            debug!(
                "attempting to convert frame {} of {} for video id: {}",
                frame_no, frame_count, job_id
            );
            let output_file = output_path.join(frame_path.file_name().unwrap_or_default());
            grayscale_frame(&frame_path, &output_file).inspect_err(|err| {
                error!(
                    "attempt to convert frame {} of {} for video id: {} failed: {:#}",
                    frame_no, frame_count, job_id, err
                );
            })
        },
    )
    .await;

    if failed > 0 {
        warn!(
            "{} of {} frame conversions failed for video id: {}",
            failed, frame_count, job_id
        );
    }
    debug!(
        "conversion of frames for video id: {} complete in {:?}",
        job_id,
        start_time.elapsed()
    );
    Ok(())
}

/// List the regular files in the frame directory, numbered from 1 for log
/// correlation. The listing itself failing is the engine's only fatal error.
fn enumerate_frames(frames_path: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let entries = fs::read_dir(frames_path)
        .with_context(|| format!("failed to list frame directory: {:?}", frames_path))?;

    let mut frames: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    frames.sort();

    Ok(frames
        .into_iter()
        .enumerate()
        .map(|(index, path)| (index + 1, path))
        .collect())
}

/// Run `task` once per item on blocking threads with at most
/// `max_concurrent` running at any moment, returning the number of failed
/// tasks once all of them - submitted and running - have finished.
async fn run_bounded<T, F>(items: Vec<T>, max_concurrent: usize, task: F) -> usize
where
    T: Send + 'static,
    F: Fn(T) -> Result<()> + Clone + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let handles = items.into_iter().map(|item| {
        let permits = Arc::clone(&permits);
        let task = task.clone();
        async move {
            let _permit = permits
                .acquire_owned()
                .await
                .expect("conversion semaphore closed");
            spawn_blocking(move || task(item))
                .await
                .unwrap_or_else(|join_error| Err(anyhow::Error::new(join_error)))
        }
    });

    join_all(handles)
        .await
        .into_iter()
        .filter(|result| result.is_err())
        .count()
}

// ────────────────────────────────────────────────────────────────
// Grayscale Conversion
// ────────────────────────────────────────────────────────────────

/// Decode one frame, replace every pixel with its grayscale value and
/// re-encode as JPEG at fixed quality under the output directory.
fn grayscale_frame(frame_path: &Path, output_file: &Path) -> Result<()> {
    let source = image::open(frame_path)
        .with_context(|| format!("failed to decode frame: {:?}", frame_path))?;

    let gray = grayscale_pixels(&source);

    let file = File::create(output_file)
        .with_context(|| format!("failed to create output frame: {:?}", output_file))?;
    JpegEncoder::new_with_quality(BufWriter::new(file), OUTPUT_JPEG_QUALITY)
        .encode_image(&gray)
        .with_context(|| format!("failed to encode output frame: {:?}", output_file))?;

    Ok(())
}

/// Full-resolution luma traversal; no subsampling.
fn grayscale_pixels(source: &DynamicImage) -> image::GrayImage {
    source.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::StorageLayout;
    use image::RgbImage;
    use reqwest::Url;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn job_in(dir: &Path) -> MediaJob {
        let id = Uuid::new_v4();
        let layout = StorageLayout::resolve(dir, &id, "mp4");
        fs::create_dir_all(&layout.frames_path).unwrap();
        fs::create_dir_all(&layout.output_path).unwrap();
        MediaJob {
            id,
            callback_url: Url::parse("http://localhost:8888/callback").unwrap(),
            layout,
            file_ext: "mp4".to_string(),
        }
    }

    fn write_frame(frames_path: &Path, name: &str) {
        let mut image = RgbImage::new(8, 8);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgb([x as u8 * 20, y as u8 * 20, 128]);
        }
        image.save(frames_path.join(name)).unwrap();
    }

    fn output_names(output_path: &Path) -> BTreeSet<String> {
        fs::read_dir(output_path)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn engine_produces_one_output_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let names: Vec<String> = (0..7).map(|n| format!("frames_{n}.jpg")).collect();
        for name in &names {
            write_frame(&job.layout.frames_path, name);
        }

        convert_frames(&job).await.unwrap();

        assert_eq!(
            output_names(&job.layout.output_path),
            names.into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[tokio::test]
    async fn corrupt_frame_is_skipped_without_failing_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        write_frame(&job.layout.frames_path, "frames_0.jpg");
        write_frame(&job.layout.frames_path, "frames_1.jpg");
        fs::write(job.layout.frames_path.join("frames_2.jpg"), b"not an image").unwrap();

        convert_frames(&job).await.unwrap();

        let converted = output_names(&job.layout.output_path);
        assert!(converted.contains("frames_0.jpg"));
        assert!(converted.contains("frames_1.jpg"));
        assert!(!converted.contains("frames_2.jpg"));
    }

    #[tokio::test]
    async fn missing_frame_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        fs::remove_dir(&job.layout.frames_path).unwrap();

        assert!(convert_frames(&job).await.is_err());
    }

    #[tokio::test]
    async fn empty_frame_directory_converts_nothing_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());

        convert_frames(&job).await.unwrap();

        assert!(output_names(&job.layout.output_path).is_empty());
    }

    #[tokio::test]
    async fn fan_out_respects_the_concurrency_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let failed = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            let completed = Arc::clone(&completed);
            run_bounded((0..12).collect::<Vec<usize>>(), 3, move |_item| {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(25));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
        };

        assert_eq!(failed, 0);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        // Barrier: every submitted task finished before run_bounded returned.
        assert_eq!(completed.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn failed_tasks_are_counted_but_do_not_abort_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = {
            let completed = Arc::clone(&completed);
            run_bounded((0..6).collect::<Vec<usize>>(), 2, move |item| {
                completed.fetch_add(1, Ordering::SeqCst);
                if item % 2 == 0 {
                    anyhow::bail!("conversion failed for item {item}");
                }
                Ok(())
            })
            .await
        };

        assert_eq!(failed, 3);
        assert_eq!(completed.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn grayscale_conversion_is_idempotent() {
        let mut image = RgbImage::new(16, 16);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgb([x as u8 * 10, 255 - y as u8 * 10, 90]);
        }

        let once = grayscale_pixels(&DynamicImage::ImageRgb8(image));
        let twice = grayscale_pixels(&DynamicImage::ImageLuma8(once.clone()));
        assert_eq!(once, twice);
    }
}

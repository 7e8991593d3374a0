use anyhow::{Context, anyhow};
use reqwest::Url;
use rocket::http::Status;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::api::AppError;
use crate::common::{
    IMAGE_STORAGE_FOLDER_NAME, OUTPUT_STORAGE_FOLDER_NAME, SUPPORTED_VIDEO_MIME,
};

/// Per-job directory tree, derived once from the job id and the configured
/// storage root. Two distinct ids can never map to overlapping paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub root_path: PathBuf,
    pub video_path: PathBuf,
    pub frames_path: PathBuf,
    pub output_path: PathBuf,
}

impl StorageLayout {
    pub fn resolve(storage_root: &Path, id: &Uuid, file_ext: &str) -> Self {
        let root_path = storage_root.join(id.to_string());
        Self {
            video_path: root_path.join(format!("{id}.{file_ext}")),
            frames_path: root_path.join(IMAGE_STORAGE_FOLDER_NAME),
            output_path: root_path.join(OUTPUT_STORAGE_FOLDER_NAME),
            root_path,
        }
    }
}

/// One accepted conversion request. Bundles id generation, path derivation
/// and upload validation into a single admission step; constructed with the
/// video already durably on disk and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub id: Uuid,
    pub callback_url: Url,
    pub layout: StorageLayout,
    pub file_ext: String,
}

impl MediaJob {
    /// Validate an upload and persist it into the job's directory tree.
    ///
    /// `staged_upload` is the multipart file already written to a staging
    /// location under `storage_root` by the HTTP layer; on success it has
    /// been renamed into place at `video_path`. The rejection carries the
    /// HTTP status the uploader should see; filesystem failures surface as
    /// 500 with no partial cleanup.
    pub fn admit(
        callback: &str,
        staged_upload: &Path,
        storage_root: &Path,
        max_upload_bytes: u64,
    ) -> Result<Self, AppError> {
        let callback_url = Url::parse(callback).map_err(|err| {
            AppError::new(
                Status::BadRequest,
                anyhow::Error::new(err).context("invalid callback URL provided"),
            )
        })?;

        let detected = infer::get_from_path(staged_upload)
            .with_context(|| format!("failed to read staged upload: {:?}", staged_upload))?;
        let file_type = match detected {
            Some(file_type) if file_type.mime_type() == SUPPORTED_VIDEO_MIME => file_type,
            _ => {
                return Err(AppError::new(
                    Status::UnsupportedMediaType,
                    anyhow!("invalid file type. File must be of type mp4"),
                ));
            }
        };

        let upload_size = fs::metadata(staged_upload)
            .with_context(|| format!("failed to stat staged upload: {:?}", staged_upload))?
            .len();
        if upload_size > max_upload_bytes {
            return Err(AppError::new(
                Status::PayloadTooLarge,
                anyhow!(
                    "file of {} bytes exceeds the maximum upload size of {} bytes",
                    upload_size,
                    max_upload_bytes
                ),
            ));
        }

        let id = Uuid::new_v4();
        let layout = StorageLayout::resolve(storage_root, &id, file_type.extension());

        fs::create_dir_all(&layout.frames_path).with_context(|| {
            format!("failed to create frame directory: {:?}", layout.frames_path)
        })?;
        fs::create_dir_all(&layout.output_path).with_context(|| {
            format!("failed to create output directory: {:?}", layout.output_path)
        })?;
        fs::rename(staged_upload, &layout.video_path).with_context(|| {
            format!("failed to move video into storage: {:?}", layout.video_path)
        })?;

        Ok(Self {
            id,
            callback_url,
            layout,
            file_ext: file_type.extension().to_string(),
        })
    }
}

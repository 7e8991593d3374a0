use anyhow::{Context, anyhow};
use log::debug;
use rocket::form::{Errors, Form, FromForm};
use rocket::fs::TempFile;
use rocket::{put, routes};
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::api::{AppError, AppResult};
use crate::common::UPLOAD_STAGING_FOLDER_NAME;
use crate::config::APP_CONFIG;
use crate::models::job::MediaJob;
use crate::workflow::flows::{detach_pipeline, try_acquire_pipeline_slot};

#[derive(FromForm, Debug)]
pub struct UploadForm<'r> {
    #[field(name = "file")]
    pub file: TempFile<'r>,
}

/// Intake endpoint. Admission runs synchronously - the video is durably on
/// disk by the time 200 is returned - while extraction, conversion and
/// callback delivery happen on a detached pipeline afterwards.
#[put("/?<callback>", data = "<form>")]
pub async fn upload(
    callback: Option<String>,
    form: Result<Form<UploadForm<'_>>, Errors<'_>>,
) -> AppResult<()> {
    debug!("new upload request received");

    let mut inner_form = match form {
        Ok(form) => form.into_inner(),
        Err(errors) => {
            let status = errors.status();
            let error_chain = errors
                .iter()
                .map(|e| anyhow!(e.to_string()))
                .reduce(|acc, e| acc.context(e.to_string()));

            return match error_chain {
                Some(chain) => Err(AppError::new(
                    status,
                    chain.context("Failed to parse upload form"),
                )),
                None => Err(AppError::new(
                    status,
                    anyhow!("Failed to parse upload form with unknown error"),
                )),
            };
        }
    };

    // Reserve a pipeline slot before touching the filesystem so saturation
    // rejects cheaply.
    let slot = try_acquire_pipeline_slot()?;

    // Stage the upload inside the storage root so admission's final rename
    // stays on one filesystem.
    let staging_dir = APP_CONFIG.storage_root.join(UPLOAD_STAGING_FOLDER_NAME);
    tokio::fs::create_dir_all(&staging_dir)
        .await
        .context("failed to create upload staging directory")?;
    let staged_path = staging_dir.join(format!("{}.tmp", Uuid::new_v4()));
    inner_form
        .file
        .move_copy_to(&staged_path)
        .await
        .context("failed to persist upload to staging area")?;

    let callback = callback.unwrap_or_default();
    let job = spawn_blocking(move || {
        MediaJob::admit(
            &callback,
            &staged_path,
            &APP_CONFIG.storage_root,
            APP_CONFIG.max_upload_bytes,
        )
    })
    .await
    .context("admission task panicked")??;

    debug!(
        "new {} video request successfully written to {:?}",
        job.file_ext, job.layout.video_path
    );
    let _handle = detach_pipeline(job, slot);

    Ok(())
}

pub fn generate_media_routes() -> Vec<rocket::Route> {
    routes![upload]
}

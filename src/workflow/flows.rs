use anyhow::anyhow;
use log::{debug, error};
use rocket::http::Status;
use std::sync::{Arc, LazyLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::api::AppError;
use crate::config::APP_CONFIG;
use crate::models::job::MediaJob;
use crate::models::outcome::JobOutcome;
use crate::workflow::processors::convert::convert_frames;
use crate::workflow::processors::extract::extract_frames;
use crate::workflow::processors::notify::deliver_callback;
use crate::workflow::status::{self, JobStage};

static PIPELINE_SLOTS: LazyLock<Arc<Semaphore>> =
    LazyLock::new(|| Arc::new(Semaphore::new(APP_CONFIG.max_concurrent_jobs)));

/// Reserve one of the bounded pipeline slots before doing any admission
/// work, or reject with 503 so the uploader can back off and retry.
pub fn try_acquire_pipeline_slot() -> Result<OwnedSemaphorePermit, AppError> {
    PIPELINE_SLOTS.clone().try_acquire_owned().map_err(|_| {
        AppError::new(
            Status::ServiceUnavailable,
            anyhow!("too many conversions in flight. Retry later"),
        )
    })
}

/// Run one job's pipeline on a detached task, carrying its pipeline slot
/// until the run ends. The HTTP response has already been sent by the time
/// any of this executes; failures end up in the log and in the callback
/// payload, never back at the uploader. The returned handle can abort the
/// run; today nothing retains it.
pub fn detach_pipeline(job: MediaJob, slot: OwnedSemaphorePermit) -> JoinHandle<()> {
    status::advance(job.id, JobStage::Queued);
    tokio::spawn(async move {
        let _slot = slot;
        conversion_workflow(job).await;
    })
}

/// Extraction, then conversion, then callback delivery for one job. The
/// outcome starts optimistic and is flipped by the first failing stage;
/// conversion is skipped once extraction has failed, and the notifier runs
/// regardless.
pub async fn conversion_workflow(job: MediaJob) {
    let mut outcome = JobOutcome::new(&job);

    status::advance(job.id, JobStage::Extracting);
    if let Err(err) = extract_frames(&job).await {
        error!(
            "error occurred when attempting to extract frames from video id: {}: {:#}",
            job.id, err
        );
        outcome.mark_failed();
    }

    if outcome.success {
        status::advance(job.id, JobStage::Converting);
        if let Err(err) = convert_frames(&job).await {
            error!(
                "error occurred when attempting to convert frames for video id: {}: {:#}",
                job.id, err
            );
            outcome.mark_failed();
        }
    }

    status::advance(job.id, JobStage::Notifying);
    if let Err(err) = deliver_callback(&job, &outcome).await {
        error!(
            "response to callback URL failed for video id: {}: {:#}",
            job.id, err
        );
    }

    status::finish(&job.id);
    debug!(
        "pipeline for video id: {} finished; artifacts remain under {:?}",
        job.id, job.layout.root_path
    );
}

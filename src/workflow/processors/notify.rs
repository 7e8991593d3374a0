//! Callback delivery - reports a job's outcome back to the caller
//!
//! One POST per attempt, retried while the response is a transport error or
//! a non-2xx status. The wait between attempts grows linearly: attempt n is
//! followed by n times the base delay (10 s, 20 s, 30 s, ... by default).

use anyhow::{Result, bail};
use log::{debug, error};
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::APP_CONFIG;
use crate::models::job::MediaJob;
use crate::models::outcome::JobOutcome;

static CALLBACK_CLIENT: LazyLock<Client> = LazyLock::new(Client::new);

/// Deliver the outcome to the job's callback URL as JSON. Stops on the
/// first success status; once the attempt budget is exhausted the delivery
/// failure is returned to the orchestrator, which only logs it - the
/// uploader's HTTP response was sent long before.
pub async fn deliver_callback(job: &MediaJob, outcome: &JobOutcome) -> Result<()> {
    debug!("attempting callback for video id: {}", job.id);

    let max_attempts = APP_CONFIG.max_callback_attempts;
    for attempt in 1..=max_attempts {
        match CALLBACK_CLIENT
            .post(job.callback_url.clone())
            .json(outcome)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("callback for video id: {} successful", job.id);
                return Ok(());
            }
            Ok(response) => {
                error!(
                    "callback attempt #{} for video id: {} failed with status {}",
                    attempt,
                    job.id,
                    response.status()
                );
            }
            Err(err) => {
                error!(
                    "callback attempt #{} for video id: {} failed: {:#}",
                    attempt, job.id, err
                );
            }
        }

        if attempt < max_attempts {
            sleep(retry_delay(attempt)).await;
        }
    }

    bail!(
        "attempts to respond to callback URL: {} failed after {} tries",
        job.callback_url,
        max_attempts
    );
}

/// Wait inserted after the given attempt number: `attempt * base_delay`.
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt) * APP_CONFIG.callback_base_delay_secs)
}

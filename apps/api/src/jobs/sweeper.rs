use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jobs::store::{JobStore, JobStoreError};

pub const STALE_JOB_MESSAGE: &str = "Processing did not finish in time and was abandoned";

/// Jobs failed by one sweep.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub failed: Vec<Uuid>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Moves every job stuck in `processing` for longer than `stale_after` to `failed`.
///
/// A worker that dies mid-pipeline never records a terminal status; without
/// this the job would stay `processing` forever.
pub async fn sweep_stale_jobs(
    jobs: &dyn JobStore,
    stale_after: chrono::Duration,
) -> Result<SweepReport, JobStoreError> {
    let cutoff = Utc::now() - stale_after;
    let failed = jobs.fail_stale(cutoff, STALE_JOB_MESSAGE).await?;

    let report = SweepReport {
        failed: failed.iter().map(|job| job.id).collect(),
    };
    for job in &failed {
        warn!(
            "Job {} ({}) failed by sweeper: processing since {}",
            job.id, job.cv_file_path, job.updated_at
        );
    }
    Ok(report)
}

/// Runs [`sweep_stale_jobs`] every `interval`. A zero interval disables the task.
pub fn spawn_sweeper(
    jobs: Arc<dyn JobStore>,
    stale_after: chrono::Duration,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("Stale job sweeper disabled");
        return None;
    }

    info!(
        "Stale job sweeper running every {}s (stale after {} min)",
        interval.as_secs(),
        stale_after.num_minutes()
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep_stale_jobs(jobs.as_ref(), stale_after).await {
                Ok(report) if !report.is_empty() => {
                    info!("Sweeper failed {} stale job(s)", report.failed.len())
                }
                Ok(_) => {}
                Err(e) => error!("Stale job sweep failed: {e}"),
            }
        }
    }))
}

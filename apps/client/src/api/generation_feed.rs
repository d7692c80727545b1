//! Progress feed for AI resume generation.
//!
//! Polls `GET /resumes/jobs/{id}` right away and then on every interval tick.
//! Each poll yields a `Progress` update; a terminal job status, or a failed
//! poll, yields exactly one `Completed` or `Failed` and ends the feed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use crate::api::resumes::ResumesClient;
use crate::models::resume::{JobStatus, ResumeJobStatus};

const FEED_CAPACITY: usize = 16;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationEvent {
    pub status: JobStatus,
    /// Coarse percentage derived from the status.
    pub progress: u8,
    pub message: &'static str,
    pub error: Option<String>,
}

impl GenerationEvent {
    fn from_status(job: &ResumeJobStatus) -> Self {
        Self {
            status: job.status,
            progress: progress_for(job.status),
            message: status_message(job.status),
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationUpdate {
    Progress(GenerationEvent),
    /// `resume_id` is `None` when the job finished without reporting a result.
    Completed { resume_id: Option<String> },
    Failed(String),
}

impl GenerationUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationUpdate::Progress(_))
    }
}

/// Handle to a running feed. Dropping it stops polling.
pub struct GenerationSubscription {
    updates: mpsc::Receiver<GenerationUpdate>,
    _poller: AbortOnDropHandle<()>,
}

impl GenerationSubscription {
    /// Next update, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<GenerationUpdate> {
        self.updates.recv().await
    }

    pub fn cancel(self) {}
}

pub fn subscribe_to_resume_generation(
    resumes: ResumesClient,
    job_id: impl Into<String>,
    interval: Duration,
) -> GenerationSubscription {
    let job_id = job_id.into();
    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    let poller = AbortOnDropHandle::new(tokio::spawn(poll_job(resumes, job_id, interval, tx)));
    GenerationSubscription {
        updates: rx,
        _poller: poller,
    }
}

async fn poll_job(
    resumes: ResumesClient,
    job_id: String,
    interval: Duration,
    tx: mpsc::Sender<GenerationUpdate>,
) {
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let job = match resumes.get_job_status(&job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Polling resume job {job_id} failed: {e}");
                let _ = tx.send(GenerationUpdate::Failed(e.to_string())).await;
                return;
            }
        };
        debug!("Resume job {job_id} is {:?}", job.status);

        if tx
            .send(GenerationUpdate::Progress(GenerationEvent::from_status(&job)))
            .await
            .is_err()
        {
            return;
        }

        let terminal = match job.status {
            JobStatus::Completed => GenerationUpdate::Completed {
                resume_id: job.result.map(|r| r.resume_id),
            },
            JobStatus::Failed => GenerationUpdate::Failed(
                job.error
                    .unwrap_or_else(|| "Resume generation failed".to_string()),
            ),
            JobStatus::Cancelled => {
                GenerationUpdate::Failed("Resume generation was cancelled".to_string())
            }
            JobStatus::Pending | JobStatus::Processing => continue,
        };
        let _ = tx.send(terminal).await;
        return;
    }
}

fn progress_for(status: JobStatus) -> u8 {
    match status {
        JobStatus::Pending => 10,
        JobStatus::Processing => 50,
        JobStatus::Completed => 100,
        JobStatus::Failed | JobStatus::Cancelled => 0,
    }
}

fn status_message(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "Job queued, waiting to start...",
        JobStatus::Processing => "AI is generating your tailored resume...",
        JobStatus::Completed => "Resume generated successfully!",
        JobStatus::Failed => "Resume generation failed",
        JobStatus::Cancelled => "Resume generation was cancelled",
    }
}

/// User-facing text for a generation worker step.
pub fn step_message(step: Option<&str>) -> &'static str {
    let Some(step) = step else {
        return "Initializing...";
    };
    match step {
        "fetching_data" => "Gathering your profile data...",
        "posts_db" => "Fetching your technical writings and posts...",
        "management_db" => "Retrieving your projects and experiences...",
        "ai_service" => "AI is analyzing the job requirements...",
        "ai_generating" => "Generating tailored resume content...",
        "resume_service" => "Creating your professional PDF...",
        "saving" => "Saving your resume...",
        "completed" => "Resume generated successfully!",
        _ => "Processing...",
    }
}

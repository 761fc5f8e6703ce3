use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::TaskQueue;
use crate::observability::{ErrorSink, Metrics};
use crate::tiktok::TokenManager;
use crate::Result;

/// Consumes due refresh jobs one at a time.
pub struct RefreshWorker {
    queue: Arc<dyn TaskQueue>,
    tokens: Arc<TokenManager>,
    error_sink: Arc<dyn ErrorSink>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
}

impl RefreshWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        tokens: Arc<TokenManager>,
        error_sink: Arc<dyn ErrorSink>,
        metrics: Arc<Metrics>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            tokens,
            error_sink,
            metrics,
            poll_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting refresh worker");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let processed = match self.process_next().await {
                Ok(processed) => processed,
                Err(e) => {
                    error!(error = %e, "Failed to read from refresh queue");
                    false
                }
            };

            if processed {
                continue;
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Refresh worker stopped");
    }

    /// Processes at most one due job, returning whether one was found.
    pub async fn process_next(&self) -> Result<bool> {
        let job = match self.queue.next_due().await? {
            Some(job) => job,
            None => return Ok(false),
        };

        debug!(id = %job.id, attempts = job.attempts_made, "Processing refresh job");

        match self.tokens.refresh(&job.task.refresh_token).await {
            Ok(tokens) => {
                info!(id = %job.id, expires_at = %tokens.expires_at, "Refreshed access token");
                self.metrics.refresh_jobs.with_label_values(&["success"]).inc();
            }
            Err(e) if e.is_grant_completed() => {
                // the follow-up job already carries the rotated token
                error!(id = %job.id, error = %e, "Refreshed access token but failed to save it");
                self.metrics.refresh_jobs.with_label_values(&["unsaved"]).inc();
                self.error_sink.capture(&e);
            }
            Err(e) => {
                error!(id = %job.id, error = %e, "Failed to refresh access token");
                self.metrics.refresh_jobs.with_label_values(&["failure"]).inc();
                self.error_sink.capture(&e);
                self.queue.fail(job, &e.to_string()).await?;
            }
        }

        Ok(true)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{FailedJob, Job, RefreshTask, RetryPolicy, TaskQueue, TaskScheduler};
use crate::Result;

/// In-process queue. Jobs are lost on restart.
pub struct MemoryTaskQueue {
    pending: Mutex<Vec<(Instant, Job)>>,
    failed: Mutex<Vec<FailedJob>>,
    retry: RetryPolicy,
}

impl MemoryTaskQueue {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
            retry,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn pending_tasks(&self) -> Vec<RefreshTask> {
        self.pending
            .lock()
            .iter()
            .map(|(_, job)| job.task.clone())
            .collect()
    }

    pub fn failed(&self) -> Vec<FailedJob> {
        self.failed.lock().clone()
    }

    fn push(&self, job: Job, delay: Duration) {
        self.pending.lock().push((Instant::now() + delay, job));
    }
}

#[async_trait]
impl TaskScheduler for MemoryTaskQueue {
    async fn schedule(&self, task: RefreshTask, delay: Duration) -> Result<()> {
        let job = Job::new(task);
        debug!(id = %job.id, ?delay, "Scheduling job");

        self.push(job, delay);
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn next_due(&self) -> Result<Option<Job>> {
        let now = Instant::now();
        let mut pending = self.pending.lock();

        let earliest = pending
            .iter()
            .enumerate()
            .filter(|(_, (due, _))| *due <= now)
            .min_by_key(|(_, (due, _))| *due)
            .map(|(i, _)| i);

        Ok(earliest.map(|i| pending.swap_remove(i).1))
    }

    async fn fail(&self, mut job: Job, reason: &str) -> Result<()> {
        if self.retry.record_attempt(&mut job) {
            debug!(id = %job.id, attempts = job.attempts_made, "Retrying job");
            self.push(job, self.retry.delay);
        } else {
            self.failed.lock().push(FailedJob {
                job,
                error: reason.to_owned(),
                failed_at: Utc::now(),
            });
        }

        Ok(())
    }
}

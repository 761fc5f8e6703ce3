mod memory_queue;
pub use memory_queue::MemoryTaskQueue;

mod redis_queue;
pub use redis_queue::RedisTaskQueue;

mod worker;
pub use worker::RefreshWorker;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTask {
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: Uuid,
    pub task: RefreshTask,
    pub attempts_made: u32,
}

impl Job {
    pub fn new(task: RefreshTask) -> Job {
        Job {
            id: Uuid::new_v4(),
            task,
            attempts_made: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedJob {
    pub job: Job,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// How the queue treats a job handed back through [`TaskQueue::fail`].
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Records the attempt on `job` and returns whether it should run again.
    fn record_attempt(&self, job: &mut Job) -> bool {
        job.attempts_made += 1;
        job.attempts_made < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(1, Duration::from_secs(60))
    }
}

#[async_trait]
pub trait TaskScheduler: Send + Sync + 'static {
    async fn schedule(&self, task: RefreshTask, delay: Duration) -> Result<()>;
}

#[async_trait]
pub trait TaskQueue: TaskScheduler {
    /// Atomically claims the earliest job whose delay has elapsed.
    async fn next_due(&self) -> Result<Option<Job>>;

    /// Hands back a job whose processing failed. The queue either schedules
    /// it again or moves it to the failed set, according to its retry policy.
    async fn fail(&self, job: Job, reason: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let mut job = Job::new(RefreshTask {
            refresh_token: "rt".to_owned(),
        });

        assert!(policy.record_attempt(&mut job));
        assert!(policy.record_attempt(&mut job));
        assert!(!policy.record_attempt(&mut job));
        assert_eq!(job.attempts_made, 3);
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let mut job = Job::new(RefreshTask {
            refresh_token: "rt".to_owned(),
        });

        assert!(!policy.record_attempt(&mut job));
    }
}

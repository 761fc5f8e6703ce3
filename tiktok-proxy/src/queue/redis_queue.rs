use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Pool, Runtime};
use tracing::debug;

use super::{FailedJob, Job, RefreshTask, RetryPolicy, TaskQueue, TaskScheduler};
use crate::Result;

const FAILED_JOBS_KEPT: isize = 1000;

// Pops the earliest member scored at or below ARGV[1]
const CLAIM_SCRIPT: &str = r"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
if #due == 0 then
    return false
end
redis.call('ZREM', KEYS[1], due[1])
return due[1]
";

/// Durable delayed queue. Pending jobs live in a sorted set scored by their
/// due time in unix millis; jobs out of attempts are pushed to a capped list.
pub struct RedisTaskQueue {
    pool: Pool,
    delayed_key: String,
    failed_key: String,
    retry: RetryPolicy,
}

impl RedisTaskQueue {
    pub fn new(pool: Pool, queue_name: &str, retry: RetryPolicy) -> Self {
        Self {
            pool,
            delayed_key: format!("tiktok-proxy:{}:delayed", queue_name),
            failed_key: format!("tiktok-proxy:{}:failed", queue_name),
            retry,
        }
    }

    pub fn connect(redis_url: &str, queue_name: &str, retry: RetryPolicy) -> Result<Self> {
        let pool = deadpool_redis::Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self::new(pool, queue_name, retry))
    }

    async fn push(&self, job: &Job, delay: Duration) -> Result<()> {
        let payload = serde_json::to_string(job)?;
        let due = due_at_millis(delay);

        let mut conn = self.pool.get().await?;
        let _: () = conn.zadd(&self.delayed_key, payload, due).await?;

        Ok(())
    }
}

fn due_at_millis(delay: Duration) -> i64 {
    let delay = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_add(delay)
}

#[async_trait]
impl TaskScheduler for RedisTaskQueue {
    async fn schedule(&self, task: RefreshTask, delay: Duration) -> Result<()> {
        let job = Job::new(task);
        debug!(id = %job.id, ?delay, "Scheduling job");

        self.push(&job, delay).await
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    async fn next_due(&self) -> Result<Option<Job>> {
        let mut conn = self.pool.get().await?;

        let payload: Option<String> = redis::cmd("EVAL")
            .arg(CLAIM_SCRIPT)
            .arg(1)
            .arg(&self.delayed_key)
            .arg(Utc::now().timestamp_millis())
            .query_async(&mut conn)
            .await?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn fail(&self, mut job: Job, reason: &str) -> Result<()> {
        if self.retry.record_attempt(&mut job) {
            debug!(id = %job.id, attempts = job.attempts_made, "Retrying job");
            return self.push(&job, self.retry.delay).await;
        }

        let failed = serde_json::to_string(&FailedJob {
            job,
            error: reason.to_owned(),
            failed_at: Utc::now(),
        })?;

        let mut conn = self.pool.get().await?;
        let _: () = conn.lpush(&self.failed_key, failed).await?;
        let _: () = conn.ltrim(&self.failed_key, 0, FAILED_JOBS_KEPT - 1).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_at_is_in_future() {
        let now = Utc::now().timestamp_millis();
        let due = due_at_millis(Duration::from_secs(60));
        assert!(due >= now + 60_000);
    }

    #[test]
    fn test_due_at_saturates() {
        assert_eq!(due_at_millis(Duration::MAX), i64::MAX);
    }

    #[test]
    fn test_keys_are_namespaced() {
        let pool = deadpool_redis::Config::from_url("redis://127.0.0.1:6379")
            .create_pool(Some(Runtime::Tokio1))
            .unwrap();
        let queue = RedisTaskQueue::new(pool, "token-refresh", RetryPolicy::default());

        assert_eq!(queue.delayed_key, "tiktok-proxy:token-refresh:delayed");
        assert_eq!(queue.failed_key, "tiktok-proxy:token-refresh:failed");
    }

    // Needs a Redis server at REDIS_URL (default redis://127.0.0.1:6379):
    // cargo test -- --ignored
    fn live_queue(retry: RetryPolicy) -> RedisTaskQueue {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_owned());
        let name = format!("test-{}", uuid::Uuid::new_v4());
        RedisTaskQueue::connect(&url, &name, retry).unwrap()
    }

    async fn cleanup(queue: &RedisTaskQueue) {
        let mut conn = queue.pool.get().await.unwrap();
        let keys = vec![queue.delayed_key.clone(), queue.failed_key.clone()];
        let _: () = conn.del(keys).await.unwrap();
    }

    fn task(token: &str) -> RefreshTask {
        RefreshTask {
            refresh_token: token.to_owned(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_claims_only_due_jobs() {
        let queue = live_queue(RetryPolicy::default());

        queue.schedule(task("later"), Duration::from_secs(3600)).await.unwrap();
        queue.schedule(task("now"), Duration::ZERO).await.unwrap();

        let job = queue.next_due().await.unwrap().unwrap();
        assert_eq!(job.task, task("now"));
        assert_eq!(job.attempts_made, 0);

        // claimed jobs leave the set
        assert!(queue.next_due().await.unwrap().is_none());

        let mut conn = queue.pool.get().await.unwrap();
        let remaining: usize = conn.zcard(&queue.delayed_key).await.unwrap();
        assert_eq!(remaining, 1);

        cleanup(&queue).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_fail_retries_then_dead_letters() {
        let queue = live_queue(RetryPolicy::new(2, Duration::ZERO));

        queue.schedule(task("rt"), Duration::ZERO).await.unwrap();

        let job = queue.next_due().await.unwrap().unwrap();
        queue.fail(job, "first").await.unwrap();

        let job = queue.next_due().await.unwrap().unwrap();
        assert_eq!(job.attempts_made, 1);
        queue.fail(job, "second").await.unwrap();

        assert!(queue.next_due().await.unwrap().is_none());

        let mut conn = queue.pool.get().await.unwrap();
        let failed: Vec<String> = conn.lrange(&queue.failed_key, 0, -1).await.unwrap();
        assert_eq!(failed.len(), 1);

        let failed: FailedJob = serde_json::from_str(&failed[0]).unwrap();
        assert_eq!(failed.job.task, task("rt"));
        assert_eq!(failed.error, "second");

        cleanup(&queue).await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_failed_list_is_capped() {
        let queue = live_queue(RetryPolicy::default());

        for _ in 0..FAILED_JOBS_KEPT + 5 {
            queue.fail(Job::new(task("rt")), "failed").await.unwrap();
        }

        let mut conn = queue.pool.get().await.unwrap();
        let len: isize = conn.llen(&queue.failed_key).await.unwrap();
        assert_eq!(len, FAILED_JOBS_KEPT);

        cleanup(&queue).await;
    }
}

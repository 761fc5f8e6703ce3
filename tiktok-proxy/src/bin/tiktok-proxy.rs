use std::sync::Arc;

use tokio::signal::ctrl_c;
use tokio::sync::watch;
use tracing::{error, info, warn};

use tiktok_proxy::database::PostgresTokenStore;
use tiktok_proxy::http::{Server, StateStore};
use tiktok_proxy::observability::{configure_observability, ErrorSink, Metrics, SentrySink};
use tiktok_proxy::queue::{
    MemoryTaskQueue, RedisTaskQueue, RefreshWorker, RetryPolicy, TaskQueue, TaskScheduler,
};
use tiktok_proxy::tiktok::{ApiClient, CampaignClient, ReportClient, TokenManager};
use tiktok_proxy::{Config, Result};

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let _guard = configure_observability(&config)?;

    let metrics = Arc::new(Metrics::new()?);
    let error_sink: Arc<dyn ErrorSink> = Arc::new(SentrySink);

    info!("Connecting to Postgres...");
    let store = PostgresTokenStore::connect(&config)?;
    store.create_schema().await?;

    let (scheduler, queue) = build_queue(&config)?;

    let client = ApiClient::new(
        &config.tiktok_api_base,
        config.request_timeout(),
        Arc::clone(&metrics),
    )?;

    let tokens = Arc::new(TokenManager::new(
        client.clone(),
        &config,
        scheduler,
        Arc::new(store),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = RefreshWorker::new(
        queue,
        Arc::clone(&tokens),
        Arc::clone(&error_sink),
        Arc::clone(&metrics),
        config.worker_poll_interval(),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));

    let server = Server::new(
        tokens,
        CampaignClient::new(client.clone()),
        ReportClient::new(client),
        StateStore::new(config.state_ttl()),
        error_sink,
        metrics,
    );

    let mut server_shutdown = shutdown_rx;
    let mut server_handle = tokio::spawn(server.start(config.server_addr()?, async move {
        let _ = server_shutdown.changed().await;
    }));

    let server_exit = tokio::select! {
        res = ctrl_c() => {
            if let Err(e) = res {
                error!(error = %e, "Failed to listen for ctrl-c");
            }
            None
        }
        res = &mut server_handle => Some(res),
    };

    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    let server_exit = match server_exit {
        Some(res) => res,
        None => server_handle.await,
    };

    match server_exit {
        Ok(Err(e)) => error!(error = %e, "Server exited with an error"),
        Err(e) => error!(error = %e, "Server task panicked"),
        Ok(Ok(())) => {}
    }

    if let Err(e) = worker_handle.await {
        error!(error = %e, "Refresh worker panicked");
    }

    Ok(())
}

fn build_queue(config: &Config) -> Result<(Arc<dyn TaskScheduler>, Arc<dyn TaskQueue>)> {
    let retry = RetryPolicy::new(config.refresh_max_attempts, config.retry_delay());

    match &config.redis_url {
        Some(redis_url) => {
            info!(queue = %config.queue_name, "Using Redis refresh queue");
            let queue = Arc::new(RedisTaskQueue::connect(redis_url, &config.queue_name, retry)?);
            Ok((Arc::clone(&queue) as Arc<dyn TaskScheduler>, queue as Arc<dyn TaskQueue>))
        }
        None => {
            warn!("REDIS_URL is not set, scheduled refreshes will not survive a restart");
            let queue = Arc::new(MemoryTaskQueue::new(retry));
            Ok((Arc::clone(&queue) as Arc<dyn TaskScheduler>, queue as Arc<dyn TaskQueue>))
        }
    }
}

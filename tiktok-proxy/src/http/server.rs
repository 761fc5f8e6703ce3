use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use warp::Filter;

use super::routes;
use super::StateStore;
use crate::observability::{ErrorSink, Metrics};
use crate::tiktok::{CampaignClient, ReportClient, TokenManager};
use crate::Result;

const MAX_BODY_SIZE: u64 = 64 * 1024;

const KNOWN_ROUTES: &[&str] = &[
    "/auth/url",
    "/auth/callback",
    "/campaign",
    "/campaign/update",
    "/report",
    "/metrics",
];

pub struct Server {
    pub(crate) tokens: Arc<TokenManager>,
    pub(crate) campaigns: CampaignClient,
    pub(crate) reports: ReportClient,
    pub(crate) states: StateStore,
    pub(crate) error_sink: Arc<dyn ErrorSink>,
    pub(crate) metrics: Arc<Metrics>,
}

impl Server {
    pub fn new(
        tokens: Arc<TokenManager>,
        campaigns: CampaignClient,
        reports: ReportClient,
        states: StateStore,
        error_sink: Arc<dyn ErrorSink>,
        metrics: Arc<Metrics>,
    ) -> Server {
        Server {
            tokens,
            campaigns,
            reports,
            states,
            error_sink,
            metrics,
        }
    }

    pub async fn start(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let filter = Arc::new(self).filter();

        let (addr, server) =
            warp::serve(filter).try_bind_with_graceful_shutdown(addr, shutdown)?;

        info!("Starting server on {}", addr);
        server.await;
        info!("Server stopped");

        Ok(())
    }

    pub fn filter(
        self: Arc<Self>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let metrics = Arc::clone(&self.metrics);
        let server = warp::any().map(move || Arc::clone(&self));

        let auth_url = warp::path!("auth" / "url")
            .and(warp::get())
            .and(server.clone())
            .and_then(routes::auth_url);

        let auth_callback = warp::path!("auth" / "callback")
            .and(warp::get())
            .and(server.clone())
            .and(warp::query::<HashMap<String, String>>())
            .and_then(routes::auth_callback);

        let campaign = warp::path!("campaign")
            .and(warp::post())
            .and(server.clone())
            .and(warp::body::content_length_limit(MAX_BODY_SIZE))
            .and(warp::body::json())
            .and_then(routes::create_campaign);

        let campaign_update = warp::path!("campaign" / "update")
            .and(warp::post())
            .and(server.clone())
            .and(warp::body::content_length_limit(MAX_BODY_SIZE))
            .and(warp::body::json())
            .and_then(routes::update_campaign);

        let report = warp::path!("report")
            .and(warp::post())
            .and(server.clone())
            .and(warp::body::content_length_limit(MAX_BODY_SIZE))
            .and(warp::body::json())
            .and_then(routes::fetch_report);

        let metrics_route = warp::path!("metrics")
            .and(warp::get())
            .and(server)
            .and_then(routes::metrics);

        auth_url
            .or(auth_callback)
            .or(campaign)
            .or(campaign_update)
            .or(report)
            .or(metrics_route)
            .recover(routes::handle_rejection)
            .with(warp::log::custom(move |info| {
                let route = KNOWN_ROUTES
                    .iter()
                    .find(|route| **route == info.path())
                    .copied()
                    .unwrap_or("other");

                metrics
                    .http_requests
                    .with_label_values(&[route, info.status().as_str()])
                    .inc();
            }))
            .with(warp::trace::request())
    }
}

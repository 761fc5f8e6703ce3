mod error_sink;
pub use error_sink::{ErrorSink, SentrySink};

mod metrics;
pub use metrics::Metrics;

use std::str::FromStr;

use sentry::types::Dsn;
use sentry_tracing::EventFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::{Config, Result};

/// Initialises Sentry and the tracing subscriber. The returned guard flushes
/// pending Sentry events when dropped, so it must outlive the server.
pub fn configure_observability(config: &Config) -> Result<sentry::ClientInitGuard> {
    let dsn = config
        .sentry_dsn
        .as_deref()
        .map(Dsn::from_str)
        .transpose()?;

    let guard = sentry::init(sentry::ClientOptions {
        dsn,
        debug: config.debug_mode,
        release: sentry::release_name!(),
        ..Default::default()
    });

    // Exceptions are sent by the ErrorSink; log lines only become breadcrumbs
    let sentry_layer = sentry_tracing::layer().event_filter(|meta| match meta.level() {
        &tracing::Level::ERROR | &tracing::Level::WARN => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    });

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(sentry_layer);

    if config.json_log {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(guard)
}

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tiktok_client_id: String,
    pub tiktok_client_secret: String,
    pub tiktok_redirect_uri: String,
    #[serde(default = "default_api_base")]
    pub tiktok_api_base: String,
    #[serde(default = "default_scopes")]
    pub tiktok_scopes: Vec<String>,

    pub database_url: String,
    #[serde(default = "default_database_threads")]
    pub database_threads: usize,

    // Falls back to the in-process queue when unset
    pub redis_url: Option<String>,
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "one")]
    pub refresh_max_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub refresh_retry_delay_secs: u64,
    #[serde(default = "default_worker_poll_interval_ms")]
    pub worker_poll_interval_ms: u64,

    pub sentry_dsn: Option<String>,
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default)]
    pub json_log: bool,

    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        envy::from_env().map_err(Into::into)
    }

    pub fn server_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(Into::into)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.refresh_retry_delay_secs)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }
}

fn default_api_base() -> String {
    "https://business-api.tiktok.com/open_api".to_owned()
}

fn default_scopes() -> Vec<String> {
    vec![
        "business.customers.read".to_owned(),
        "business.ad.read".to_owned(),
        "business.ad.report.write".to_owned(),
    ]
}

fn default_database_threads() -> usize {
    4
}

fn default_queue_name() -> String {
    "token-refresh".to_owned()
}

fn one() -> u32 {
    1
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_worker_poll_interval_ms() -> u64 {
    1000
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_state_ttl_secs() -> u64 {
    600
}

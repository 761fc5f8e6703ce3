use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::observability::Metrics;

/// Every TikTok Business API response is wrapped in this envelope. A zero
/// `code` means success.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    metrics: Arc<Metrics>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<ApiClient, reqwest::Error> {
        let http = reqwest::ClientBuilder::new()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            metrics,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` as JSON and unwraps the `data` payload of the response.
    /// `call` labels the request in metrics.
    pub async fn post<B, T>(
        &self,
        call: &'static str,
        path: &str,
        access_token: Option<&str>,
        body: &B,
    ) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let timer = self
            .metrics
            .upstream_duration
            .with_label_values(&[call])
            .start_timer();

        let res = self.send(path, access_token, body).await;
        timer.observe_duration();

        if let Err(e) = &res {
            warn!(call, error = %e, "TikTok request failed");
            self.metrics
                .upstream_failures
                .with_label_values(&[call])
                .inc();
        }

        res
    }

    async fn send<B, T>(
        &self,
        path: &str,
        access_token: Option<&str>,
        body: &B,
    ) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let uri = self.endpoint(path);
        debug!("Requesting {}", uri);

        let mut req = self.http.post(&uri).json(body);
        if let Some(token) = access_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let res = req.send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::StatusError(status));
        }

        let bytes = res.bytes().await?;
        let parsed = match serde_json::from_slice::<ApiResponse<T>>(&bytes[..]) {
            Ok(v) => v,
            Err(e) => {
                debug!(
                    "Error deserialising response: {}\nFull body: {:?}",
                    e,
                    std::str::from_utf8(&bytes[..])
                );
                return Err(e.into());
            }
        };

        if parsed.code != 0 {
            return Err(UpstreamError::ApiError {
                code: parsed.code,
                message: parsed.message,
            });
        }

        parsed.data.ok_or(UpstreamError::MissingData)
    }
}

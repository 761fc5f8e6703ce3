use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use url::Url;

use super::client::ApiClient;
use super::models::{Grant, TokenGrant, TokenRequest, Tokens};
use crate::database::TokenStore;
use crate::queue::{RefreshTask, TaskScheduler};
use crate::{Config, Error, Result};

/// Refreshes are scheduled this long before the access token expires.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub struct TokenManager {
    client: ApiClient,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
    scheduler: Arc<dyn TaskScheduler>,
    store: Arc<dyn TokenStore>,
}

impl TokenManager {
    pub fn new(
        client: ApiClient,
        config: &Config,
        scheduler: Arc<dyn TaskScheduler>,
        store: Arc<dyn TokenStore>,
    ) -> TokenManager {
        TokenManager {
            client,
            client_id: config.tiktok_client_id.clone(),
            client_secret: config.tiktok_client_secret.clone(),
            redirect_uri: config.tiktok_redirect_uri.clone(),
            scopes: config.tiktok_scopes.clone(),
            scheduler,
            store,
        }
    }

    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            &self.client.endpoint("oauth2/authorize"),
            &[
                ("client_key", self.client_id.as_str()),
                ("response_type", "code"),
                ("scope", self.scopes.join(",").as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )?;

        Ok(url)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        debug!("Exchanging authorization code");

        let grant = self
            .request_tokens(
                "oauth_access_token",
                "oauth2/access_token/",
                Grant::AuthorizationCode { code },
            )
            .await?;

        self.complete_grant(grant).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        debug!("Refreshing access token");

        let grant = self
            .request_tokens(
                "oauth_refresh_token",
                "oauth2/refresh_token/",
                Grant::RefreshToken { refresh_token },
            )
            .await?;

        self.complete_grant(grant).await
    }

    async fn request_tokens(
        &self,
        call: &'static str,
        path: &str,
        grant: Grant<'_>,
    ) -> Result<TokenGrant> {
        let body = TokenRequest {
            client_key: &self.client_id,
            client_secret: &self.client_secret,
            grant,
        };

        self.client
            .post(call, path, None, &body)
            .await
            .map_err(Error::UpstreamAuthError)
    }

    // next refresh is queued before the tokens are saved
    async fn complete_grant(&self, grant: TokenGrant) -> Result<Tokens> {
        let tokens = Tokens::from_grant(grant, Utc::now()).map_err(Error::UpstreamAuthError)?;

        let delay = refresh_delay(tokens.expires_in);
        let scheduled = self
            .scheduler
            .schedule(
                RefreshTask {
                    refresh_token: tokens.refresh_token.clone(),
                },
                delay,
            )
            .await;

        let stored = self.store.update_tokens(&self.client_id, &tokens).await;

        scheduled?;
        info!(expires_at = %tokens.expires_at, ?delay, "Scheduled token refresh");

        stored.map_err(|e| Error::TokenPersistError(Box::new(e)))?;
        Ok(tokens)
    }
}

/// Time until the refresh for a token living `expires_in` seconds is due.
pub fn refresh_delay(expires_in: i64) -> Duration {
    let lifetime = Duration::from_secs(expires_in.max(0) as u64);
    lifetime.saturating_sub(REFRESH_MARGIN)
}

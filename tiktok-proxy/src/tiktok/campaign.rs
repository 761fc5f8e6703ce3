use serde_json::Value;
use tracing::info;

use super::client::ApiClient;
use super::models::{
    CampaignCreateRequest, CampaignParams, CampaignUpdate, CampaignUpdateRequest,
};
use crate::{Error, Result};

#[derive(Clone)]
pub struct CampaignClient {
    client: ApiClient,
}

impl CampaignClient {
    pub fn new(client: ApiClient) -> CampaignClient {
        CampaignClient { client }
    }

    /// Creates a website conversion campaign with an unlimited budget mode and
    /// returns the `data` object of TikTok's response.
    pub async fn create_campaign(&self, token: &str, params: &CampaignParams) -> Result<Value> {
        if params.advertiser_id.is_empty() {
            return Error::MissingField("advertiser_id").into();
        }

        if params.campaign_name.is_empty() {
            return Error::MissingField("campaign_name").into();
        }

        validate_budget(params.budget)?;

        let body = CampaignCreateRequest::from(params);

        let data: Value = self
            .client
            .post("campaign_create", "v1.3/campaign/create/", Some(token), &body)
            .await
            .map_err(Error::UpstreamCampaignError)?;

        info!(advertiser_id = %params.advertiser_id, "Created campaign");
        Ok(data)
    }

    /// Changes the name and/or budget of an existing campaign.
    pub async fn update_campaign(&self, token: &str, update: &CampaignUpdate) -> Result<Value> {
        if update.advertiser_id.is_empty() {
            return Error::MissingField("advertiser_id").into();
        }

        if update.campaign_id.is_empty() {
            return Error::MissingField("campaign_id").into();
        }

        if update.campaign_name.is_none() && update.budget.is_none() {
            return Error::invalid("campaign", "one of campaign_name or budget is required").into();
        }

        if update.campaign_name.as_deref() == Some("") {
            return Error::invalid("campaign_name", "must not be empty").into();
        }

        if let Some(budget) = update.budget {
            validate_budget(budget)?;
        }

        let body = CampaignUpdateRequest::from(update);

        let data: Value = self
            .client
            .post("campaign_update", "v1.3/campaign/update/", Some(token), &body)
            .await
            .map_err(Error::UpstreamCampaignError)?;

        info!(campaign_id = %update.campaign_id, "Updated campaign");
        Ok(data)
    }
}

fn validate_budget(budget: f64) -> Result<()> {
    if !budget.is_finite() || budget <= 0.0 {
        return Error::invalid("budget", "must be a positive number").into();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiktok::CampaignStatus;
    use crate::test_support::{api_client, FakeUpstream};

    fn params() -> CampaignParams {
        CampaignParams {
            advertiser_id: "7000000000000".to_owned(),
            campaign_name: "Affiliate launch".to_owned(),
            budget: 500.0,
            status: CampaignStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_payload_merges_defaults() {
        let upstream = FakeUpstream::start().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let data = client.create_campaign("access-1", &params()).await.unwrap();
        assert_eq!(data["campaign_id"], "1800000000000001");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);

        let body = &requests[0].body;
        assert!(requests[0].path.ends_with("/v1.3/campaign/create/"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer access-1"));
        assert_eq!(body["advertiser_id"], "7000000000000");
        assert_eq!(body["campaign_name"], "Affiliate launch");
        assert_eq!(body["budget"], 500.0);
        assert_eq!(body["status"], "ACTIVE");
        assert_eq!(body["budget_mode"], "BUDGET_MODE_INFINITE");
        assert_eq!(body["landing_type"], "WEBSITE");
        assert_eq!(body["objective_type"], "CONVERSION");
    }

    #[tokio::test]
    async fn test_validation_skips_upstream() {
        let upstream = FakeUpstream::start().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let mut no_name = params();
        no_name.campaign_name = String::new();
        let res = client.create_campaign("access-1", &no_name).await;
        assert!(matches!(res, Err(Error::MissingField("campaign_name"))));

        let mut negative = params();
        negative.budget = -1.0;
        let res = client.create_campaign("access-1", &negative).await;
        assert!(matches!(res, Err(Error::InvalidField { field: "budget", .. })));

        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let upstream = FakeUpstream::start_failing().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let res = client.create_campaign("access-1", &params()).await;
        assert!(matches!(res, Err(Error::UpstreamCampaignError(_))));
    }

    fn update() -> CampaignUpdate {
        CampaignUpdate {
            advertiser_id: "7000000000000".to_owned(),
            campaign_id: "1800000000000001".to_owned(),
            campaign_name: Some("Affiliate relaunch".to_owned()),
            budget: None,
        }
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let upstream = FakeUpstream::start().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let data = client.update_campaign("access-1", &update()).await.unwrap();
        assert_eq!(data["campaign_id"], "1800000000000001");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].path.ends_with("/v1.3/campaign/update/"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer access-1"));

        let body = &requests[0].body;
        assert_eq!(body["campaign_id"], "1800000000000001");
        assert_eq!(body["campaign_name"], "Affiliate relaunch");
        assert!(body.get("budget").is_none());
    }

    #[tokio::test]
    async fn test_update_validation() {
        let upstream = FakeUpstream::start().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let mut empty = update();
        empty.campaign_name = None;
        let res = client.update_campaign("access-1", &empty).await;
        assert!(matches!(res, Err(Error::InvalidField { field: "campaign", .. })));

        let mut no_id = update();
        no_id.campaign_id = String::new();
        let res = client.update_campaign("access-1", &no_id).await;
        assert!(matches!(res, Err(Error::MissingField("campaign_id"))));

        let mut zero_budget = update();
        zero_budget.budget = Some(0.0);
        let res = client.update_campaign("access-1", &zero_budget).await;
        assert!(matches!(res, Err(Error::InvalidField { field: "budget", .. })));

        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_upstream_failure() {
        let upstream = FakeUpstream::start_with_api_error().await;
        let client = CampaignClient::new(api_client(&upstream.base_url));

        let res = client.update_campaign("access-1", &update()).await;
        assert!(matches!(res, Err(Error::UpstreamCampaignError(_))));
    }
}

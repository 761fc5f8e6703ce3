use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::UpstreamError;

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub client_key: &'a str,
    pub client_secret: &'a str,
    #[serde(flatten)]
    pub grant: Grant<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub(crate) enum Grant<'a> {
    AuthorizationCode { code: &'a str },
    RefreshToken { refresh_token: &'a str },
}

/// `data` payload of the token and refresh endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_token_expires_in: Option<i64>,
    pub open_id: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Tokens {
    pub(crate) fn from_grant(
        grant: TokenGrant,
        issued_at: DateTime<Utc>,
    ) -> Result<Tokens, UpstreamError> {
        let refresh_expires_at = match grant.refresh_token_expires_in {
            Some(secs) => Some(expiry(issued_at, secs)?),
            None => None,
        };

        Ok(Tokens {
            expires_at: expiry(issued_at, grant.expires_in)?,
            refresh_expires_at,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_in: grant.expires_in,
            open_id: grant.open_id,
            scope: grant.scope,
        })
    }
}

fn expiry(issued_at: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>, UpstreamError> {
    Duration::try_seconds(secs)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or(UpstreamError::InvalidExpiry(secs))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum BudgetMode {
    #[serde(rename = "BUDGET_MODE_INFINITE")]
    Infinite,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandingType {
    Website,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    Conversion,
}

/// Caller-supplied campaign fields, already checked for presence.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignParams {
    pub advertiser_id: String,
    pub campaign_name: String,
    pub budget: f64,
    pub status: CampaignStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct CampaignCreateRequest<'a> {
    pub advertiser_id: &'a str,
    pub campaign_name: &'a str,
    pub budget_mode: BudgetMode,
    pub budget: f64,
    pub landing_type: LandingType,
    pub status: CampaignStatus,
    pub objective_type: ObjectiveType,
}

impl<'a> From<&'a CampaignParams> for CampaignCreateRequest<'a> {
    fn from(params: &'a CampaignParams) -> Self {
        CampaignCreateRequest {
            advertiser_id: &params.advertiser_id,
            campaign_name: &params.campaign_name,
            budget_mode: BudgetMode::Infinite,
            budget: params.budget,
            landing_type: LandingType::Website,
            status: params.status,
            objective_type: ObjectiveType::Conversion,
        }
    }
}

/// Fields of an existing campaign to change. Absent fields are left as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignUpdate {
    pub advertiser_id: String,
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CampaignUpdateRequest<'a> {
    pub advertiser_id: &'a str,
    pub campaign_id: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

impl<'a> From<&'a CampaignUpdate> for CampaignUpdateRequest<'a> {
    fn from(update: &'a CampaignUpdate) -> Self {
        CampaignUpdateRequest {
            advertiser_id: &update.advertiser_id,
            campaign_id: &update.campaign_id,
            campaign_name: update.campaign_name.as_deref(),
            budget: update.budget,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Basic,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataLevel {
    AuctionAd,
}

pub(crate) const REPORT_DIMENSIONS: &[&str] = &["campaign_id"];
pub(crate) const REPORT_METRICS: &[&str] = &["impressions", "click", "convert"];

#[derive(Debug, Serialize)]
pub(crate) struct ReportRequest<'a> {
    pub advertiser_id: &'a str,
    pub report_type: ReportType,
    pub data_level: DataLevel,
    pub dimensions: &'a [&'a str],
    pub metrics: &'a [&'a str],
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub campaign_ids: &'a [String],
}

/// One row per campaign: `{"dimensions": {...}, "metrics": {...}}`. Rows are
/// passed through exactly as TikTok returns them.
pub type ReportRow = serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportPage {
    #[serde(default)]
    pub list: Vec<ReportRow>,
}

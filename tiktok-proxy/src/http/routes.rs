use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use warp::http::StatusCode;
use warp::filters::body::BodyDeserializeError;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::reply::{self, Reply, Response};
use warp::Rejection;

use super::Server;
use crate::tiktok::{CampaignParams, CampaignStatus, CampaignUpdate};
use crate::{Error, Result};

#[derive(Serialize, Debug)]
struct AuthUrlResponse {
    url: String,
}

#[derive(Deserialize, Debug)]
pub struct CampaignBody {
    token: Option<String>,
    advertiser_id: Option<String>,
    campaign_name: Option<String>,
    budget: Option<f64>,
    status: Option<CampaignStatus>,
}

impl CampaignBody {
    fn into_params(self) -> Result<(String, CampaignParams)> {
        let token = self.token.ok_or(Error::MissingField("token"))?;
        let params = CampaignParams {
            advertiser_id: self.advertiser_id.ok_or(Error::MissingField("advertiser_id"))?,
            campaign_name: self.campaign_name.ok_or(Error::MissingField("campaign_name"))?,
            budget: self.budget.ok_or(Error::MissingField("budget"))?,
            status: self.status.ok_or(Error::MissingField("status"))?,
        };

        Ok((token, params))
    }
}

#[derive(Deserialize, Debug)]
pub struct CampaignUpdateBody {
    token: Option<String>,
    advertiser_id: Option<String>,
    campaign_id: Option<String>,
    campaign_name: Option<String>,
    budget: Option<f64>,
}

impl CampaignUpdateBody {
    fn into_update(self) -> Result<(String, CampaignUpdate)> {
        let token = self.token.ok_or(Error::MissingField("token"))?;
        let update = CampaignUpdate {
            advertiser_id: self.advertiser_id.ok_or(Error::MissingField("advertiser_id"))?,
            campaign_id: self.campaign_id.ok_or(Error::MissingField("campaign_id"))?,
            campaign_name: self.campaign_name,
            budget: self.budget,
        };

        Ok((token, update))
    }
}

#[derive(Deserialize, Debug)]
pub struct ReportBody {
    token: Option<String>,
    advertiser_id: Option<String>,
    #[serde(default)]
    campaign_ids: Vec<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

pub async fn auth_url(server: Arc<Server>) -> std::result::Result<Response, warp::Rejection> {
    let state = match server.states.issue() {
        Some(state) => state,
        None => {
            warn!("Too many outstanding OAuth states");
            return Ok(reply::with_status(
                "Too many pending authorizations",
                StatusCode::SERVICE_UNAVAILABLE,
            )
            .into_response());
        }
    };

    match server.tokens.authorization_url(&state) {
        Ok(url) => Ok(reply::json(&AuthUrlResponse { url: url.into() }).into_response()),
        Err(e) => Ok(server.internal_error(e, "Failed to build authorization URL")),
    }
}

pub async fn auth_callback(
    server: Arc<Server>,
    query: HashMap<String, String>,
) -> std::result::Result<Response, warp::Rejection> {
    let code = match query.get("code").filter(|code| !code.is_empty()) {
        Some(code) => code,
        None => return Ok(bad_request("Missing code")),
    };

    let state_valid = query
        .get("state")
        .map_or(false, |state| server.states.consume(state));

    if !state_valid {
        debug!("Rejected OAuth callback with unknown state");
        return Ok(bad_request("Invalid state"));
    }

    match server.tokens.exchange_code(code).await {
        Ok(tokens) => Ok(reply::json(&tokens).into_response()),
        Err(e) => Ok(server.internal_error(e, "Auth exchange failed")),
    }
}

pub async fn create_campaign(
    server: Arc<Server>,
    body: CampaignBody,
) -> std::result::Result<Response, warp::Rejection> {
    let res = match body.into_params() {
        Ok((token, params)) => server.campaigns.create_campaign(&token, &params).await,
        Err(e) => Err(e),
    };

    match res {
        Ok(campaign) => Ok(reply::json(&campaign).into_response()),
        Err(e) if e.is_validation() => Ok(bad_request(e.to_string())),
        Err(e) => Ok(server.internal_error(e, "Campaign creation failed")),
    }
}

pub async fn update_campaign(
    server: Arc<Server>,
    body: CampaignUpdateBody,
) -> std::result::Result<Response, warp::Rejection> {
    let res = match body.into_update() {
        Ok((token, update)) => server.campaigns.update_campaign(&token, &update).await,
        Err(e) => Err(e),
    };

    match res {
        Ok(campaign) => Ok(reply::json(&campaign).into_response()),
        Err(e) if e.is_validation() => Ok(bad_request(e.to_string())),
        Err(e) => Ok(server.internal_error(e, "Campaign update failed")),
    }
}

pub async fn fetch_report(
    server: Arc<Server>,
    body: ReportBody,
) -> std::result::Result<Response, warp::Rejection> {
    let res = match (body.token, body.advertiser_id, body.start_date, body.end_date) {
        (Some(token), Some(advertiser_id), Some(start_date), Some(end_date)) => {
            server
                .reports
                .fetch_stats(&token, &advertiser_id, &body.campaign_ids, &start_date, &end_date)
                .await
        }
        (None, ..) => Err(Error::MissingField("token")),
        (_, None, ..) => Err(Error::MissingField("advertiser_id")),
        (_, _, None, _) => Err(Error::MissingField("start_date")),
        (.., None) => Err(Error::MissingField("end_date")),
    };

    match res {
        Ok(rows) => Ok(reply::json(&rows).into_response()),
        Err(e) if e.is_validation() => Ok(bad_request(e.to_string())),
        Err(e) => Ok(server.internal_error(e, "Report fetch failed")),
    }
}

pub async fn metrics(server: Arc<Server>) -> std::result::Result<Response, warp::Rejection> {
    match server.metrics.encode() {
        Ok(body) => Ok(reply::with_header(
            body,
            "Content-Type",
            server.metrics.content_type(),
        )
        .into_response()),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            Ok(reply::with_status("Unable to encode metrics", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response())
        }
    }
}

/// Turns warp's own rejections into plain replies so they pass through the
/// request metrics like any other response.
pub async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Rejection> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_owned())
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_owned())
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type".to_owned())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else {
        error!(rejection = ?err, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
    };

    Ok(reply::with_status(message, status).into_response())
}

fn bad_request(message: impl Into<String>) -> Response {
    reply::with_status(message.into(), StatusCode::BAD_REQUEST).into_response()
}

impl Server {
    fn internal_error(&self, e: Error, message: &'static str) -> Response {
        error!(error = %e, "{}", message);
        self.error_sink.capture(&e);

        reply::with_status(message, StatusCode::INTERNAL_SERVER_ERROR).into_response()
    }
}

use chrono::NaiveDate;

use super::client::ApiClient;
use super::models::{
    DataLevel, ReportPage, ReportRequest, ReportRow, ReportType, REPORT_DIMENSIONS, REPORT_METRICS,
};
use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct ReportClient {
    client: ApiClient,
}

impl ReportClient {
    pub fn new(client: ApiClient) -> ReportClient {
        ReportClient { client }
    }

    /// Fetches impressions, clicks and conversions per campaign for the
    /// inclusive date range. Rows are returned as TikTok sends them.
    pub async fn fetch_stats(
        &self,
        token: &str,
        advertiser_id: &str,
        campaign_ids: &[String],
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<ReportRow>> {
        if advertiser_id.is_empty() {
            return Error::MissingField("advertiser_id").into();
        }

        let start = parse_date("start_date", start_date)?;
        let end = parse_date("end_date", end_date)?;
        if start > end {
            return Error::invalid("end_date", "must not be before start_date").into();
        }

        let body = ReportRequest {
            advertiser_id,
            report_type: ReportType::Basic,
            data_level: DataLevel::AuctionAd,
            dimensions: REPORT_DIMENSIONS,
            metrics: REPORT_METRICS,
            start_date,
            end_date,
            campaign_ids,
        };

        let page: ReportPage = self
            .client
            .post("report_get", "v1.3/report/integrated/get/", Some(token), &body)
            .await
            .map_err(Error::UpstreamReportError)?;

        Ok(page.list)
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| Error::invalid(field, e))
}

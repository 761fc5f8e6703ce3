mod campaign;
mod client;
mod models;
pub mod oauth;
mod report;

pub use campaign::CampaignClient;
pub use client::ApiClient;
pub use models::{CampaignParams, CampaignStatus, CampaignUpdate, ReportRow, Tokens};
pub use oauth::TokenManager;
pub use report::ReportClient;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error requesting TikTok OAuth tokens: {0}")]
    UpstreamAuthError(#[source] UpstreamError),

    #[error("Error creating TikTok campaign: {0}")]
    UpstreamCampaignError(#[source] UpstreamError),

    #[error("Error fetching TikTok report: {0}")]
    UpstreamReportError(#[source] UpstreamError),

    #[error("Tokens were issued but could not be saved: {0}")]
    TokenPersistError(#[source] Box<Error>),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Error while loading config: {0}")]
    ConfigError(#[from] envy::Error),

    #[error("Error while building HTTP client: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Error while operating on JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Error while parsing URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Error while parsing address: {0}")]
    AddrParseError(#[from] std::net::AddrParseError),

    #[error("Error while parsing Sentry DSN: {0}")]
    DsnParseError(#[from] sentry::types::ParseDsnError),

    #[error("Error while operating on Postgres: {0}")]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Error while getting Postgres conn: {0}")]
    PostgresPoolError(#[from] deadpool_postgres::PoolError),

    #[error("Error while creating Postgres pool: {0}")]
    PostgresCreatePoolError(#[from] deadpool_postgres::CreatePoolError),

    #[error("Error while operating on Redis: {0}")]
    RedisError(#[from] deadpool_redis::redis::RedisError),

    #[error("Error while getting Redis conn: {0}")]
    RedisPoolError(#[from] deadpool_redis::PoolError),

    #[error("Error while creating Redis pool: {0}")]
    RedisCreatePoolError(#[from] deadpool_redis::CreatePoolError),

    #[error("Error while operating on metrics: {0}")]
    PrometheusError(#[from] prometheus::Error),

    #[error("Error while starting server: {0}")]
    WarpError(#[from] warp::Error),
}

impl Error {
    /// Errors caused by the caller's input rather than by a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::InvalidField { .. })
    }

    /// TikTok issued new tokens and the next refresh was scheduled, but saving
    /// them failed. Retrying with the previous refresh token is pointless.
    pub fn is_grant_completed(&self) -> bool {
        matches!(self, Error::TokenPersistError(_))
    }

    pub fn invalid(field: &'static str, reason: impl ToString) -> Error {
        Error::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}

impl<T> From<Error> for Result<T> {
    fn from(e: Error) -> Self {
        Err(e)
    }
}

/// A failed call to the TikTok Business API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Error while performing HTTP operation: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("TikTok responded with status {0}")]
    StatusError(reqwest::StatusCode),

    #[error("TikTok responded with code {code}: {message}")]
    ApiError { code: i64, message: String },

    #[error("TikTok response is missing its data payload")]
    MissingData,

    #[error("TikTok returned an out of range token lifetime: {0}s")]
    InvalidExpiry(i64),

    #[error("Error while decoding TikTok response: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub mod database;
pub mod http;
pub mod observability;
pub mod queue;
pub mod tiktok;

mod config;
pub use config::Config;

mod error;
pub use error::{Error, Result, UpstreamError};

#[cfg(test)]
mod test_support;

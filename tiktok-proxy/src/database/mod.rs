mod postgres;
pub use postgres::PostgresTokenStore;

use async_trait::async_trait;

use crate::tiktok::Tokens;
use crate::Result;

#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    async fn update_tokens(&self, client_id: &str, tokens: &Tokens) -> Result<()>;
}

use async_trait::async_trait;
use deadpool_postgres::{Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

use super::TokenStore;
use crate::config::Config;
use crate::tiktok::Tokens;
use crate::Result;

pub struct PostgresTokenStore {
    pool: Pool,
}

impl PostgresTokenStore {
    pub fn connect(config: &Config) -> Result<PostgresTokenStore> {
        let pg_config = deadpool_postgres::Config {
            url: Some(config.database_url.clone()),
            pool: Some(PoolConfig::new(config.database_threads)),
            ..Default::default()
        };

        let pool = pg_config.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(PostgresTokenStore { pool })
    }

    pub async fn create_schema(&self) -> Result<()> {
        let query = "
CREATE TABLE IF NOT EXISTS tiktok_tokens(
    \"client_id\" VARCHAR(255) NOT NULL,
    \"access_token\" TEXT NOT NULL,
    \"refresh_token\" TEXT NOT NULL,
    \"expires\" TIMESTAMPTZ NOT NULL,
    \"refresh_expires\" TIMESTAMPTZ,
    \"open_id\" VARCHAR(255),
    \"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY(\"client_id\")
);
        ";

        let client = self.pool.get().await?;
        client.batch_execute(query).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PostgresTokenStore {
    async fn update_tokens(&self, client_id: &str, tokens: &Tokens) -> Result<()> {
        let query = "
INSERT INTO
    tiktok_tokens (\"client_id\", \"access_token\", \"refresh_token\", \"expires\", \"refresh_expires\", \"open_id\")
VALUES
    ($1, $2, $3, $4, $5, $6)
ON CONFLICT (\"client_id\") DO
UPDATE
    SET \"access_token\" = EXCLUDED.access_token,
        \"refresh_token\" = EXCLUDED.refresh_token,
        \"expires\" = EXCLUDED.expires,
        \"refresh_expires\" = EXCLUDED.refresh_expires,
        \"open_id\" = EXCLUDED.open_id,
        \"updated_at\" = NOW()
        ";

        let client = self.pool.get().await?;
        client
            .execute(
                query,
                &[
                    &client_id,
                    &tokens.access_token,
                    &tokens.refresh_token,
                    &tokens.expires_at,
                    &tokens.refresh_expires_at,
                    &tokens.open_id,
                ],
            )
            .await?;

        Ok(())
    }
}

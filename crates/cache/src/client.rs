//! Redis-backed durable store for the usage ledger.
//! The whole ledger record lives as one JSON string under a single key.

use async_trait::async_trait;
use campaign_billing::{LedgerState, LedgerStore, LedgerStoreError};
use campaign_core::config::RedisConfig;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

pub struct RedisLedgerStore {
    client: redis::Client,
    key: String,
}

impl RedisLedgerStore {
    /// Connect to Redis and verify the server answers.
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, key = %config.ledger_key, "Connecting to Redis ledger store");

        let client = redis::Client::open(url.as_str())?;

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| anyhow::anyhow!("Redis connect timed out after {timeout:?}"))??;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        Ok(Self {
            client,
            key: config.ledger_key.clone(),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, LedgerStoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)
    }
}

fn backend_error(err: redis::RedisError) -> LedgerStoreError {
    metrics::counter!("cache.ledger.errors").increment(1);
    LedgerStoreError::Backend(err.to_string())
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    async fn load(&self) -> Result<Option<LedgerState>, LedgerStoreError> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn.get(&self.key).await.map_err(backend_error)?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => {
                debug!(key = %self.key, "No ledger record in Redis yet");
                Ok(None)
            }
        }
    }

    async fn save(&self, state: &LedgerState) -> Result<(), LedgerStoreError> {
        let json = serde_json::to_string(state)?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(&self.key, &json)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_malformed_url() {
        let config = RedisConfig {
            urls: vec!["not a redis url".to_string()],
            ..Default::default()
        };
        assert!(RedisLedgerStore::new(&config).await.is_err());
    }
}

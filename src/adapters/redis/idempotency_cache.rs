//! Redis implementation of the idempotency response cache.
//!
//! Keys follow the `idempotency:<key>` scheme; values are the JSON
//! receipt a replayed request returns verbatim.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::DomainError;
use crate::domain::payment::ChargeReceipt;
use crate::ports::{HealthCheck, IdempotencyCache};

fn cache_key(key: &str) -> String {
    format!("idempotency:{key}")
}

/// Redis-backed idempotency cache.
#[derive(Clone)]
pub struct RedisIdempotencyCache {
    conn: ConnectionManager,
}

impl RedisIdempotencyCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connects and validates the connection with a ping.
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client =
            redis::Client::open(url).map_err(|err| DomainError::cache(err.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| DomainError::cache(err.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl IdempotencyCache for RedisIdempotencyCache {
    async fn get(&self, key: &str) -> Result<Option<ChargeReceipt>, DomainError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(cache_key(key))
            .await
            .map_err(|err| DomainError::cache(err.to_string()))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|err| DomainError::cache(format!("corrupt cached receipt: {err}"))),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        receipt: &ChargeReceipt,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let json = serde_json::to_string(receipt)
            .map_err(|err| DomainError::cache(err.to_string()))?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(cache_key(key), json, ttl.as_secs())
            .await
            .map_err(|err| DomainError::cache(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for RedisIdempotencyCache {
    async fn check(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }
}

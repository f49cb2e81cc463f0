//! Database liveness check.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::HealthCheck;

/// Reports database reachability via a trivial query.
pub struct PostgresHealth {
    pool: PgPool,
}

impl PostgresHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PostgresHealth {
    async fn check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

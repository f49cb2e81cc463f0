//! PostgreSQL implementation of PaymentMethodReader.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentMethodId, UserId};
use crate::domain::payment::{PaymentMethod, TokenKind};
use crate::ports::PaymentMethodReader;

/// PostgreSQL implementation of the PaymentMethodReader port.
pub struct PostgresPaymentMethodReader {
    pool: PgPool,
}

impl PostgresPaymentMethodReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    user_id: Uuid,
    token_kind: String,
    network_token: Option<String>,
    processor_a_token: Option<String>,
    processor_b_token: Option<String>,
    last_four: String,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = DomainError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        let token_kind = TokenKind::parse(&row.token_kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid token kind: {}", row.token_kind),
            )
        })?;

        Ok(PaymentMethod {
            id: PaymentMethodId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            token_kind,
            network_token: row.network_token,
            processor_a_token: row.processor_a_token,
            processor_b_token: row.processor_b_token,
            last_four: row.last_four,
        })
    }
}

#[async_trait]
impl PaymentMethodReader for PostgresPaymentMethodReader {
    async fn find_by_id(
        &self,
        id: &PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let row: Option<PaymentMethodRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, token_kind, network_token,
                   processor_a_token, processor_b_token, last_four
            FROM payment_methods
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PaymentMethod::try_from).transpose()
    }
}

//! Payment method reader port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentMethodId};
use crate::domain::payment::PaymentMethod;

/// Read-only access to stored payment methods. The orchestrator only
/// ever reads tokens; vaulting happens upstream.
#[async_trait]
pub trait PaymentMethodReader: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, DomainError>;
}

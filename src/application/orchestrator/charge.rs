//! Charge command handler - the synchronous charge path.
//!
//! One charge runs: idempotency check, routing decision, token pick,
//! primary attempt, secondary attempt on transport failure, transaction
//! persistence, response caching, event emission.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentMethodId, SubscriptionId, Timestamp, TransactionId,
};
use crate::domain::payment::{
    user_message_for, ChargeReceipt, OrchestrationEvent, Transaction,
};
use crate::domain::routing::{ProcessorRoute, RoutingRequest};
use crate::ports::{
    ChargeExecutor, ChargeOutcome, EventPublisher, IdempotencyCache, PaymentMethodReader,
    ProcessorChargeRequest, ProcessorClient, ProcessorError, RoutingAuthority,
    TransactionRepository,
};

/// Input to the charge path.
#[derive(Debug, Clone)]
pub struct ChargeCommand {
    pub subscription_id: Option<SubscriptionId>,
    pub payment_method_id: PaymentMethodId,
    pub amount_minor: i64,
    pub currency: String,
    pub idempotency_key: Option<String>,
}

/// Result of the charge path: the receipt plus whether it was replayed
/// from a previous request with the same idempotency key.
#[derive(Debug, Clone)]
pub struct ChargeConclusion {
    pub receipt: ChargeReceipt,
    pub replayed: bool,
}

/// What one processor attempt produced, when it produced a business
/// answer at all.
struct AttemptReply {
    success: bool,
    processor: String,
    processor_transaction_id: Option<String>,
    error_code: Option<String>,
}

/// Command handler for `POST /orchestrator/charge`.
pub struct ProcessChargeHandler {
    transactions: Arc<dyn TransactionRepository>,
    payment_methods: Arc<dyn PaymentMethodReader>,
    cache: Arc<dyn IdempotencyCache>,
    routing: Arc<dyn RoutingAuthority>,
    processors: HashMap<String, Arc<dyn ProcessorClient>>,
    events: Arc<dyn EventPublisher>,
    cache_ttl: Duration,
}

impl ProcessChargeHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        payment_methods: Arc<dyn PaymentMethodReader>,
        cache: Arc<dyn IdempotencyCache>,
        routing: Arc<dyn RoutingAuthority>,
        processors: HashMap<String, Arc<dyn ProcessorClient>>,
        events: Arc<dyn EventPublisher>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            transactions,
            payment_methods,
            cache,
            routing,
            processors,
            events,
            cache_ttl,
        }
    }

    /// Run the full charge path for one command.
    pub async fn handle(&self, command: ChargeCommand) -> Result<ChargeConclusion, DomainError> {
        let started = Instant::now();

        if command.amount_minor <= 0 {
            return Err(DomainError::validation("amount", "Amount must be positive"));
        }
        if command.currency.is_empty() {
            return Err(DomainError::validation("currency", "Currency is required"));
        }

        // The server transaction id exists before any processor is
        // contacted; it is what callers and events refer to.
        let transaction_id = TransactionId::new();
        let idempotency_key = command
            .idempotency_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.emit(OrchestrationEvent::ChargeInitiated {
            transaction_id,
            subscription_id: command.subscription_id,
            amount_minor: command.amount_minor,
            currency: command.currency.clone(),
            occurred_at: Timestamp::now(),
        })
        .await;

        if let Some(receipt) = self.lookup_idempotent(&idempotency_key).await {
            tracing::info!(
                idempotency_key = %idempotency_key,
                transaction_id = %receipt.transaction_id,
                "Replaying stored charge response"
            );
            return Ok(ChargeConclusion {
                receipt,
                replayed: true,
            });
        }

        let route = self.decide_route(&command).await;

        let method = self
            .payment_methods
            .find_by_id(&command.payment_method_id)
            .await?
            .ok_or_else(|| DomainError::payment_method_not_found(command.payment_method_id))?;
        if !method.has_token() {
            return Err(DomainError::new(
                ErrorCode::MissingPaymentToken,
                "Payment method has no usable token",
            ));
        }

        // Primary attempt; transport failures and an unhealthy primary
        // fail over, declines do not.
        let mut failed_over = false;
        let reply = match self
            .attempt(&route.primary, method.token_for(&route.primary), &command, &idempotency_key)
            .await
        {
            Ok(reply) => Some(reply),
            Err(err) => {
                tracing::warn!(
                    processor = %route.primary,
                    error = %err,
                    "Primary processor failed, attempting failover"
                );
                self.emit(OrchestrationEvent::FailoverTriggered {
                    transaction_id,
                    from_processor: route.primary.clone(),
                    to_processor: route.secondary.clone(),
                    amount_minor: command.amount_minor,
                    currency: command.currency.clone(),
                    occurred_at: Timestamp::now(),
                })
                .await;
                failed_over = true;

                // Same idempotency key on the secondary: if the primary
                // actually committed, the key still binds one outcome.
                match self
                    .attempt(
                        &route.secondary,
                        method.token_for(&route.secondary),
                        &command,
                        &idempotency_key,
                    )
                    .await
                {
                    Ok(reply) => Some(reply),
                    Err(err) => {
                        tracing::error!(
                            processor = %route.secondary,
                            error = %err,
                            "Secondary processor also failed"
                        );
                        None
                    }
                }
            }
        };

        let receipt = match &reply {
            Some(reply) => ChargeReceipt {
                success: reply.success,
                transaction_id,
                processor_used: reply.processor.clone(),
                amount_minor: command.amount_minor,
                currency: command.currency.clone(),
                error_code: reply.error_code.clone(),
                user_message: reply
                    .error_code
                    .as_deref()
                    .map(|code| user_message_for(code).to_string()),
            },
            None => ChargeReceipt::processors_unavailable(
                transaction_id,
                command.amount_minor,
                command.currency.clone(),
            ),
        };

        let transaction = Transaction::charge(
            transaction_id,
            command.subscription_id,
            Some(command.payment_method_id),
            receipt.processor_used.clone(),
            command.amount_minor,
            command.currency.clone(),
            receipt.success,
            idempotency_key.clone(),
            reply.as_ref().and_then(|r| r.processor_transaction_id.clone()),
            receipt.error_code.clone(),
            receipt.user_message.clone(),
        );

        // The processor already committed or declined; a log write
        // failure must not flip the caller's answer. The unique key
        // constraint covers replays.
        if let Err(err) = self.transactions.insert(&transaction).await {
            tracing::error!(
                transaction_id = %transaction_id,
                error = %err,
                "Failed to persist transaction"
            );
        }

        if let Err(err) = self.cache.put(&idempotency_key, &receipt, self.cache_ttl).await {
            tracing::warn!(
                idempotency_key = %idempotency_key,
                error = %err,
                "Failed to cache charge response"
            );
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        if receipt.success {
            self.emit(OrchestrationEvent::ChargeSucceeded {
                transaction_id,
                subscription_id: command.subscription_id,
                amount_minor: command.amount_minor,
                currency: command.currency.clone(),
                processor_used: receipt.processor_used.clone(),
                duration_ms,
                occurred_at: Timestamp::now(),
            })
            .await;
            if failed_over {
                tracing::info!(
                    processor = %receipt.processor_used,
                    "Charge succeeded after failover"
                );
            }
        } else {
            self.emit(OrchestrationEvent::ChargeFailed {
                transaction_id,
                subscription_id: command.subscription_id,
                amount_minor: command.amount_minor,
                currency: command.currency.clone(),
                processor_used: receipt.processor_used.clone(),
                error_code: receipt.error_code.clone(),
                user_message: receipt.user_message.clone(),
                occurred_at: Timestamp::now(),
            })
            .await;
        }

        Ok(ChargeConclusion {
            receipt,
            replayed: false,
        })
    }

    /// Cache first, transaction store second; a DB hit backfills the
    /// cache for the next replay.
    async fn lookup_idempotent(&self, key: &str) -> Option<ChargeReceipt> {
        match self.cache.get(key).await {
            Ok(Some(receipt)) => return Some(receipt),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Idempotency cache lookup failed, falling back to store");
            }
        }

        match self.transactions.find_by_idempotency_key(key).await {
            Ok(Some(tx)) => {
                let receipt = ChargeReceipt::from_transaction(&tx);
                if let Err(err) = self.cache.put(key, &receipt, self.cache_ttl).await {
                    tracing::warn!(error = %err, "Failed to backfill idempotency cache");
                }
                Some(receipt)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Idempotency store lookup failed");
                None
            }
        }
    }

    /// Ask the routing authority; any failure or unusable answer falls
    /// back to the default processor pair.
    async fn decide_route(&self, command: &ChargeCommand) -> ProcessorRoute {
        let request = RoutingRequest {
            amount_minor: command.amount_minor,
            currency: command.currency.clone(),
            ..Default::default()
        };

        match self.routing.route(&request).await {
            Ok(route) if !route.primary.is_empty() && !route.secondary.is_empty() => route,
            Ok(_) => {
                tracing::warn!("Routing returned empty processors, using defaults");
                ProcessorRoute::fallback()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Routing failed, using defaults");
                ProcessorRoute::fallback()
            }
        }
    }

    /// One processor attempt. `Ok` carries a business answer (approval
    /// or decline, both final); `Err` means the attempt never got one
    /// and failover may proceed.
    async fn attempt(
        &self,
        processor_name: &str,
        token: Option<&str>,
        command: &ChargeCommand,
        idempotency_key: &str,
    ) -> Result<AttemptReply, ProcessorError> {
        let client = self.processors.get(processor_name).ok_or_else(|| {
            ProcessorError::Unhealthy {
                processor: processor_name.to_string(),
            }
        })?;

        if !client.is_healthy() {
            return Err(ProcessorError::Unhealthy {
                processor: processor_name.to_string(),
            });
        }

        let token = token.ok_or_else(|| ProcessorError::Unhealthy {
            processor: processor_name.to_string(),
        })?;

        let request = ProcessorChargeRequest {
            amount_minor: command.amount_minor,
            currency: command.currency.clone(),
            token: token.to_string(),
            idempotency_key: idempotency_key.to_string(),
        };

        match client.charge(request).await {
            Ok(response) => {
                if let Some(message) = &response.error_message {
                    tracing::debug!(
                        processor = processor_name,
                        error_code = response.error_code.as_deref().unwrap_or(""),
                        message = %message,
                        "Processor declined charge"
                    );
                }
                Ok(AttemptReply {
                    success: response.success,
                    processor: processor_name.to_string(),
                    processor_transaction_id: response.transaction_id,
                    error_code: response.error_code,
                })
            }
            // Other 4xx: final for this attempt, no failover.
            Err(ProcessorError::Fatal {
                status, message, ..
            }) => {
                tracing::warn!(
                    processor = processor_name,
                    status,
                    message = %message,
                    "Processor rejected charge request"
                );
                Ok(AttemptReply {
                    success: false,
                    processor: processor_name.to_string(),
                    processor_transaction_id: None,
                    error_code: Some(error_code_for_status(status).to_string()),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn emit(&self, event: OrchestrationEvent) {
        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(error = %err, "Failed to publish orchestration event");
        }
    }
}

fn error_code_for_status(status: u16) -> &'static str {
    match status {
        400 => "BAD_REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        409 => "CONFLICT",
        422 => "UNPROCESSABLE_ENTITY",
        _ => "UNKNOWN_ERROR",
    }
}

/// The scheduler bills through the same handler the synchronous path
/// uses; failures fold into the outcome so batch processing continues.
#[async_trait]
impl ChargeExecutor for ProcessChargeHandler {
    async fn charge_subscription(&self, subscription: &Subscription) -> ChargeOutcome {
        let Some(payment_method_id) = subscription.payment_method_id else {
            return ChargeOutcome {
                success: false,
                transaction_id: None,
                processor_used: None,
                error_code: Some(ErrorCode::PaymentMethodNotFound.to_string()),
                error_message: Some("Subscription has no payment method".to_string()),
            };
        };

        let command = ChargeCommand {
            subscription_id: Some(subscription.id),
            payment_method_id,
            amount_minor: subscription.amount_minor,
            currency: subscription.currency.clone(),
            idempotency_key: None,
        };

        match self.handle(command).await {
            Ok(conclusion) => ChargeOutcome {
                success: conclusion.receipt.success,
                transaction_id: Some(conclusion.receipt.transaction_id),
                processor_used: Some(conclusion.receipt.processor_used.clone()),
                error_code: conclusion.receipt.error_code.clone(),
                error_message: conclusion.receipt.user_message,
            },
            Err(err) => ChargeOutcome::orchestrator_error(err.to_string()),
        }
    }
}

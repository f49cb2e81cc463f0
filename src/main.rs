//! Payrail service binary.
//!
//! Hosts the orchestrator, rule engine, and scheduler surfaces on one
//! listener, plus the background workers (scheduler loop, per-processor
//! health probes). Shutdown is graceful: the listener drains, workers
//! receive a stop signal, and the in-flight scheduler tick completes
//! within its deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tracing_subscriber::EnvFilter;

use payrail::adapters::{
    orchestrator_router, routing_router, scheduler_router, HttpProcessorClient,
    OrchestratorAppState, PostgresHealth, PostgresJobRepository, PostgresPaymentMethodReader,
    PostgresRetryQueue, PostgresSubscriptionStore, PostgresTransactionRepository,
    RedisIdempotencyCache, RoutingAppState, SchedulerAppState, TracingEventPublisher,
};
use payrail::application::billing::{BillingExecutor, Scheduler};
use payrail::application::orchestrator::{ProcessChargeHandler, ProcessRefundHandler};
use payrail::application::routing::{RuleEngine, ThreadRngSampler};
use payrail::config::AppConfig;
use payrail::domain::billing::RetryPolicy;
use payrail::domain::routing::ProcessorRoute;
use payrail::ports::{
    ChargeExecutor, EventPublisher, HealthCheck, ProcessorClient, RoutingAuthority,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    config.validate()?;
    tracing::info!(
        addr = %config.server.socket_addr(),
        "Payment orchestration platform starting"
    );

    // Database
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Cache
    let cache = RedisIdempotencyCache::connect(&config.redis.url).await?;

    // Shutdown signal shared by all background workers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Processor clients with background health probes.
    let processor_a = Arc::new(HttpProcessorClient::new(
        "processor_a",
        config.processors.processor_a_url.clone(),
        config.processors.call_timeout(),
    ));
    let processor_b = Arc::new(HttpProcessorClient::new(
        "processor_b",
        config.processors.processor_b_url.clone(),
        config.processors.call_timeout(),
    ));
    processor_a
        .clone()
        .spawn_health_probe(config.processors.health_interval(), shutdown_rx.clone());
    processor_b
        .clone()
        .spawn_health_probe(config.processors.health_interval(), shutdown_rx.clone());

    let mut processors: HashMap<String, Arc<dyn ProcessorClient>> = HashMap::new();
    processors.insert("processor_a".to_string(), processor_a);
    processors.insert("processor_b".to_string(), processor_b);

    // Rule engine
    let engine = Arc::new(RuleEngine::from_file(
        &config.routing.rules_path,
        Box::new(ThreadRngSampler),
        ProcessorRoute {
            primary: config.routing.default_primary.clone(),
            secondary: config.routing.default_secondary.clone(),
        },
    ));

    // Repositories and publishers
    let transactions = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let payment_methods = Arc::new(PostgresPaymentMethodReader::new(pool.clone()));
    let subscriptions = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let jobs = Arc::new(PostgresJobRepository::new(pool.clone()));
    let retries = Arc::new(PostgresRetryQueue::new(pool.clone()));
    let events: Arc<dyn EventPublisher> = Arc::new(TracingEventPublisher);

    // Command handlers
    let charge = Arc::new(ProcessChargeHandler::new(
        transactions.clone(),
        payment_methods,
        Arc::new(cache.clone()),
        engine.clone() as Arc<dyn RoutingAuthority>,
        processors.clone(),
        events.clone(),
        Duration::from_secs(config.redis.idempotency_ttl_secs),
    ));
    let refund = Arc::new(ProcessRefundHandler::new(
        transactions.clone(),
        processors.clone(),
        events,
    ));

    // Scheduler
    let executor = Arc::new(BillingExecutor::new(
        jobs.clone(),
        retries.clone(),
        subscriptions.clone(),
        charge.clone() as Arc<dyn ChargeExecutor>,
        RetryPolicy::default(),
    ));
    let scheduler = Arc::new(Scheduler::new(
        subscriptions,
        retries.clone(),
        jobs.clone(),
        executor.clone(),
        config.scheduler.clone(),
    ));
    let scheduler_handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

    // Routers
    let orchestrator_state = OrchestratorAppState {
        charge,
        refund,
        transactions,
        processors,
        dependencies: vec![
            ("database", Arc::new(PostgresHealth::new(pool)) as Arc<dyn HealthCheck>),
            ("cache", Arc::new(cache) as Arc<dyn HealthCheck>),
        ],
    };
    let routing_state = RoutingAppState { engine };
    let scheduler_state = SchedulerAppState {
        scheduler,
        executor,
        jobs,
        retries,
    };

    let app = Router::new()
        .merge(orchestrator_router().with_state(orchestrator_state))
        .merge(routing_router().with_state(routing_state))
        .merge(scheduler_router().with_state(scheduler_state))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|_: tower::BoxError| async {
                    StatusCode::REQUEST_TIMEOUT
                }))
                .layer(TimeoutLayer::new(config.server.request_timeout())),
        );

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    tracing::info!(addr = %config.server.socket_addr(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop workers and let the in-flight tick finish.
    tracing::info!("Shutting down, waiting for scheduler to finish current batch");
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(config.scheduler.tick_deadline(), scheduler_handle)
        .await
        .is_err()
    {
        tracing::warn!("Scheduler did not stop within deadline");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! # Remit Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository, rate provider, and gateway adapters
//! - Create the transfer service and reconciler
//! - Spawn the pending-transaction reaper
//! - Start the HTTP server

mod collab;
mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remit_engine::{Reaper, RiskScorer, TransferService, WebhookReconciler};
use remit_engine::fees::FeeCalculator;
use remit_engine::inbound::HttpServer;
use remit_engine::quotes::QuoteService;
use remit_gateways::{GatewayRegistry, RetryPolicy};
use remit_rates::{CachedRateProvider, HttpRateSource, MarginSchedule, StaticRateSource};
use remit_repo::SqliteRepo;
use remit_types::RateProvider;

use collab::{StaticKycDirectory, TracingAuditSink, TracingNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,remit_app=debug,remit_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting transfer server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build repository (handles connection and migration)
    let repo = Arc::new(SqliteRepo::new(&config.database_url).await?);

    // Rate provider: live feed when configured, static table otherwise
    let rates: Arc<dyn RateProvider> = match &config.rate_feed_url {
        Some(url) => {
            tracing::info!(feed = %url, "using live rate feed");
            Arc::new(CachedRateProvider::new(
                HttpRateSource::new(url.clone()),
                config.rate_cache_ttl,
                MarginSchedule::default(),
            ))
        }
        None => {
            tracing::warn!("RATE_FEED_URL not set, using static rate table");
            Arc::new(CachedRateProvider::new(
                StaticRateSource,
                config.rate_cache_ttl,
                MarginSchedule::default(),
            ))
        }
    };

    // Gateway adapters share one HTTP client
    let registry = GatewayRegistry::from_configs(config.gateways.clone(), reqwest::Client::new());
    let configured: Vec<_> = registry.kinds().collect();
    if configured.is_empty() {
        tracing::warn!("no payment gateways configured, settlement is unavailable");
    } else {
        tracing::info!(?configured, "payment gateways configured");
    }

    let audit = Arc::new(TracingAuditSink);
    let service = TransferService::new(
        repo.clone(),
        QuoteService::new(
            rates,
            FeeCalculator::new(config.fees.clone()),
            config.quote_ttl,
        ),
        RiskScorer::new(config.risk),
        registry.clone(),
        RetryPolicy::default(),
        Arc::new(StaticKycDirectory::from_env()),
        audit.clone(),
        Arc::new(TracingNotifier),
        config.verification_ttl,
    );
    let reconciler = WebhookReconciler::new(repo.clone(), registry, audit.clone());

    // Background reaper for abandoned transfers
    let reaper = Reaper::new(
        repo.clone(),
        audit,
        config.pending_timeout,
        config.reaper_interval,
    );
    tokio::spawn(reaper.run());

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limit(service, reconciler, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}

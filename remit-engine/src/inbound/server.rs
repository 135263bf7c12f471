//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use remit_types::TransferRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::reconciler::WebhookReconciler;
use crate::service::TransferService;

/// HTTP Server for the transfer API.
pub struct HttpServer<R: TransferRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: TransferRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given services.
    pub fn new(service: TransferService<R>, reconciler: WebhookReconciler<R>) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                reconciler,
            }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(
        service: TransferService<R>,
        reconciler: WebhookReconciler<R>,
        requests_per_minute: u32,
    ) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState {
                service,
                reconciler,
            }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route("/api/quotes", post(handlers::create_quote::<R>))
            .route("/api/transactions", post(handlers::create_transaction::<R>))
            .route("/api/transactions", get(handlers::list_transactions::<R>))
            .route(
                "/api/transactions/{id}",
                get(handlers::get_transaction::<R>),
            )
            .route(
                "/api/transactions/{id}/verify",
                post(handlers::verify_transaction::<R>),
            )
            .route(
                "/api/transactions/{id}/cancel",
                post(handlers::cancel_transaction::<R>),
            )
            .route(
                "/api/payments/{transaction_id}/process",
                post(handlers::process_payment::<R>),
            )
            .route("/api/webhooks/{gateway_id}", post(handlers::webhook::<R>))
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

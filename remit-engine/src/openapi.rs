//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use remit_types::domain::{
    Currency, FeeBreakdown, FxRate, GatewayKind, Money, PaymentId, PaymentStatus, Quote, QuoteId,
    Recipient, TransactionEvent, TransactionId, TransactionStatus,
};
use remit_types::dto::{
    CreateTransactionRequest, DeviceContext, PaymentResponse, ProcessPaymentRequest, QuoteRequest,
    TransactionDetailResponse, TransactionResponse, VerificationPendingResponse,
    VerifyTransactionRequest,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Price a transfer
#[utoipa::path(
    post,
    path = "/api/quotes",
    tag = "quotes",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quote issued", body = Quote),
        (status = 400, description = "Invalid amount or unsupported currency")
    )
)]
async fn create_quote() {}

/// Commit a quote into a transaction
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    params(
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 201, description = "Transaction created as PENDING", body = TransactionResponse),
        (status = 202, description = "Secondary verification required", body = VerificationPendingResponse),
        (status = 403, description = "Blocked by security screening"),
        (status = 410, description = "Quote expired")
    )
)]
async fn create_transaction() {}

/// Complete step-up verification of a held transfer
#[utoipa::path(
    post,
    path = "/api/transactions/{id}/verify",
    tag = "transactions",
    request_body = VerifyTransactionRequest,
    params(
        ("id" = TransactionId, Path, description = "Transaction ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 201, description = "Transaction created as PENDING", body = TransactionResponse),
        (status = 400, description = "Incorrect verification code"),
        (status = 410, description = "Verification window expired")
    )
)]
async fn verify_transaction() {}

/// Cancel a pending transaction
#[utoipa::path(
    post,
    path = "/api/transactions/{id}/cancel",
    tag = "transactions",
    params(
        ("id" = TransactionId, Path, description = "Transaction ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 200, description = "Transaction cancelled", body = TransactionResponse),
        (status = 400, description = "Already finalized or payment in flight"),
        (status = 404, description = "Transaction not found")
    )
)]
async fn cancel_transaction() {}

/// Get a transaction with its transition history
#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = TransactionId, Path, description = "Transaction ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 200, description = "Transaction with history", body = TransactionDetailResponse),
        (status = 404, description = "Transaction not found")
    )
)]
async fn get_transaction() {}

/// List the caller's transactions
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "transactions",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 200, description = "The caller's transactions", body = Vec<TransactionResponse>)
    )
)]
async fn list_transactions() {}

/// Settle a pending transaction through a gateway
#[utoipa::path(
    post,
    path = "/api/payments/{transaction_id}/process",
    tag = "payments",
    request_body = ProcessPaymentRequest,
    params(
        ("transaction_id" = TransactionId, Path, description = "Transaction ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Authenticated caller id (UUID)")
    ),
    responses(
        (status = 200, description = "Payment initiated", body = PaymentResponse),
        (status = 400, description = "Gateway does not support the currency"),
        (status = 502, description = "Payment provider error")
    )
)]
async fn process_payment() {}

/// Gateway webhook intake
#[utoipa::path(
    post,
    path = "/api/webhooks/{gateway_id}",
    tag = "webhooks",
    params(
        ("gateway_id" = String, Path, description = "Gateway identifier: card, eft, or open_banking"),
        ("X-Webhook-Signature" = String, Header, description = "HMAC-SHA256 signature of the raw body")
    ),
    responses(
        (status = 200, description = "Delivery absorbed"),
        (status = 401, description = "Invalid signature"),
        (status = 404, description = "Unknown gateway")
    )
)]
async fn webhook() {}

/// OpenAPI documentation for the transfer API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Remit Transfer Engine API",
        version = "1.0.0",
        description = "Cross-border transfer engine: quoting with frozen FX rates, risk-screened transaction creation, gateway payment orchestration, and webhook reconciliation.\n\nCallers are authenticated upstream; the proxy injects the caller id via the `X-User-Id` header.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_quote,
        create_transaction,
        verify_transaction,
        cancel_transaction,
        get_transaction,
        list_transactions,
        process_payment,
        webhook,
    ),
    components(
        schemas(
            QuoteRequest,
            Quote,
            QuoteId,
            FxRate,
            FeeBreakdown,
            Money,
            Currency,
            DeviceContext,
            CreateTransactionRequest,
            VerifyTransactionRequest,
            VerificationPendingResponse,
            TransactionResponse,
            TransactionDetailResponse,
            TransactionEvent,
            TransactionId,
            TransactionStatus,
            Recipient,
            ProcessPaymentRequest,
            PaymentResponse,
            PaymentId,
            PaymentStatus,
            GatewayKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quotes", description = "Transfer pricing"),
        (name = "transactions", description = "Transaction lifecycle operations"),
        (name = "payments", description = "Gateway payment initiation"),
        (name = "webhooks", description = "Gateway settlement notifications"),
    )
)]
pub struct ApiDoc;

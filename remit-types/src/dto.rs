//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Currency, GatewayKind, Payment, PaymentId, PaymentStatus, QuoteId, Recipient, Transaction,
    TransactionEvent, TransactionId, TransactionStatus,
};

// ─────────────────────────────────────────────────────────────────────────────
// Quote DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to price a transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Amount to send in smallest currency unit (cents)
    #[schema(example = 50000)]
    pub send_amount: i64,
    pub from_currency: Currency,
    pub to_currency: Currency,
    /// Request express processing (adds a surcharge)
    #[serde(default)]
    pub express: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Device and location signals attached to a transfer request,
/// consumed by risk screening.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceContext {
    /// Opaque device fingerprint computed client-side
    #[schema(example = "fp_9f8e7d6c")]
    pub fingerprint: String,
    /// Country resolved from the request IP
    #[schema(example = "ZA")]
    pub ip_country: String,
    /// Country the user declared on their profile
    #[schema(example = "ZA")]
    pub declared_country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Request to commit a previously issued quote into a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    pub quote_id: QuoteId,
    pub recipient: Recipient,
    /// Optional idempotency key to prevent duplicate transactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub device: DeviceContext,
}

/// Request to complete secondary verification of a held transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyTransactionRequest {
    /// One-time token returned with the 202 response
    pub token: String,
    /// OTP delivered out-of-band
    #[schema(example = "483921")]
    pub otp: String,
}

/// Returned with HTTP 202 when a transfer needs step-up verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationPendingResponse {
    pub verification_required: bool,
    /// Id reserved for the transaction, final once verification passes
    pub transaction_id: TransactionId,
    /// One-time token identifying the held transfer candidate
    pub token: String,
    /// Seconds until the held candidate expires
    pub expires_in_secs: u64,
}

/// Client-facing view of a Transaction.
///
/// Risk factor detail is deliberately omitted; it goes to the audit
/// sink only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub status: TransactionStatus,
    pub recipient: Recipient,
    /// Amount sent in smallest currency unit
    pub send_amount: i64,
    pub currency: Currency,
    pub destination_currency: Currency,
    /// Frozen rate used for this transfer
    pub rate: f64,
    /// Total fee in smallest currency unit
    pub fee: i64,
    /// send_amount + fee
    pub total_cost: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    /// When the transaction was created (ISO 8601)
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        let total_cost = tx.total_cost().amount();
        Self {
            id: tx.id,
            status: tx.status,
            recipient: tx.recipient,
            send_amount: tx.send_amount.amount(),
            currency: tx.send_amount.currency(),
            destination_currency: tx.destination_currency,
            rate: tx.rate,
            fee: tx.fee.amount(),
            total_cost,
            failure_reason: tx.failure_reason,
            payment_reference: tx.payment_reference,
            created_at: tx.created_at,
        }
    }
}

/// Transaction with its full transition history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetailResponse {
    #[serde(flatten)]
    pub transaction: TransactionResponse,
    pub history: Vec<TransactionEvent>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to settle a pending transaction through a gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessPaymentRequest {
    pub gateway: GatewayKind,
    /// Provider-specific fields passed through opaquely
    #[serde(default)]
    #[schema(value_type = Object)]
    pub fields: serde_json::Value,
}

/// Client-facing view of a Payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub transaction_id: TransactionId,
    pub gateway: GatewayKind,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.id,
            transaction_id: p.transaction_id,
            gateway: p.gateway,
            status: p.status,
            external_id: p.external_id,
        }
    }
}

//! Payment gateway port: the capability contract every provider
//! implementation satisfies.

use crate::domain::{Currency, GatewayKind, Money, PaymentId, PaymentStatus, TransactionId};
use crate::error::GatewayError;

/// Static per-provider configuration, consumed read-only.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    /// Base URL of the provider API.
    pub endpoint: String,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    pub currencies: Vec<Currency>,
}

/// A settlement initiation request handed to a gateway.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub payment_id: PaymentId,
    pub transaction_id: TransactionId,
    pub amount: Money,
    /// Caller-generated key the provider is expected to deduplicate on,
    /// so a repeated initiate never creates two charges.
    pub idempotency_key: String,
    /// Provider-specific fields (card token, account number, consent id).
    pub fields: serde_json::Value,
}

/// What the provider returned from a successful initiation.
#[derive(Debug, Clone)]
pub struct PaymentHandle {
    pub external_id: String,
    pub status: PaymentStatus,
    pub metadata: serde_json::Value,
}

/// A gateway webhook normalized to the engine's vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookNotice {
    pub external_id: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: Currency,
}

/// Uniform interface over heterogeneous payment providers.
///
/// One implementation per `GatewayKind`; the engine selects by kind
/// through the registry and never branches on provider specifics.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    fn kind(&self) -> GatewayKind;

    /// Currencies this provider can settle, from `GatewayConfig`.
    fn supported_currencies(&self) -> &[Currency];

    /// Initiates settlement with the provider. Idempotent from the
    /// caller's perspective via `PaymentRequest::idempotency_key`.
    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentHandle, GatewayError>;

    /// Verifies the provider's webhook signature scheme.
    fn verify_signature(&self, payload: &[u8], signature: &str) -> bool;

    /// Parses a raw webhook body into the normalized notice.
    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError>;

    /// Convenience guard used before initiation.
    fn supports(&self, currency: Currency) -> bool {
        self.supported_currencies().contains(&currency)
    }
}

//! Error types for the transfer engine.

use crate::domain::{Currency, GatewayKind};

/// Domain-level errors (business logic violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {amount} outside allowed range [{min}, {max}]")]
    AmountOutOfRange { amount: i64, min: i64, max: i64 },

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Exchange-rate provider errors.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Rate source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Payment gateway interaction errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway {gateway} does not support {currency}")]
    UnsupportedGatewayCurrency {
        gateway: GatewayKind,
        currency: Currency,
    },

    /// Transient network/provider failure; eligible for retry.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The provider rejected the charge; not retried.
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Malformed gateway payload: {0}")]
    MalformedPayload(String),
}

impl GatewayError {
    /// Only transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors for the HTTP boundary.
///
/// Every variant maps to a stable machine-readable code and an HTTP
/// status; internal detail is never serialized to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Gateway {gateway} does not support {currency}")]
    UnsupportedGatewayCurrency {
        gateway: GatewayKind,
        currency: Currency,
    },

    /// Risk screening blocked the transaction. The message stays generic;
    /// the factor detail goes only to the audit sink.
    #[error("Transaction blocked by security screening")]
    FraudBlocked,

    #[error("Quote has expired, request a new quote")]
    QuoteExpired,

    #[error("Verification window has expired, restart the transfer")]
    VerificationExpired,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Payment provider error")]
    Gateway(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            AppError::UnsupportedGatewayCurrency { .. } => "UNSUPPORTED_GATEWAY_CURRENCY",
            AppError::FraudBlocked => "FRAUD_BLOCKED",
            AppError::QuoteExpired => "QUOTE_EXPIRED",
            AppError::VerificationExpired => "VERIFICATION_EXPIRED",
            AppError::InvalidSignature => "INVALID_SIGNATURE",
            AppError::Gateway(_) => "GATEWAY_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnsupportedCurrency(code) => AppError::UnsupportedCurrency(code),
            e => AppError::Validation(e.to_string()),
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::UnsupportedCurrency(code) => AppError::UnsupportedCurrency(code),
            RateError::SourceUnavailable(e) => AppError::Internal(e),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::UnsupportedGatewayCurrency { gateway, currency } => {
                AppError::UnsupportedGatewayCurrency { gateway, currency }
            }
            GatewayError::Declined(reason) => AppError::Gateway(reason),
            GatewayError::Transport(e) => AppError::Gateway(e),
            GatewayError::MalformedPayload(e) => AppError::Validation(e),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::Validation(msg),
            RepoError::Domain(e) => AppError::Validation(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Validation(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_blocked_message_is_generic() {
        let err = AppError::FraudBlocked;
        let msg = err.to_string();
        assert!(!msg.contains("score"));
        assert!(!msg.contains("factor"));
        assert_eq!(err.code(), "FRAUD_BLOCKED");
    }

    #[test]
    fn test_unsupported_currency_maps_through() {
        let app: AppError = DomainError::UnsupportedCurrency("JPY".into()).into();
        assert_eq!(app.code(), "UNSUPPORTED_CURRENCY");
    }

    #[test]
    fn test_gateway_transport_retryable() {
        assert!(GatewayError::Transport("connection reset".into()).is_retryable());
        assert!(!GatewayError::Declined("insufficient funds".into()).is_retryable());
    }
}

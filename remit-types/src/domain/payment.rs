//! Payment domain model: one settlement attempt against a gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use super::transaction::TransactionId;

/// Unique identifier for a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The closed set of payment providers the engine can settle through.
///
/// Adding a provider means adding a variant here plus a gateway adapter,
/// never branching on strings scattered through the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    Card,
    Eft,
    OpenBanking,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Card => "card",
            GatewayKind::Eft => "eft",
            GatewayKind::OpenBanking => "open_banking",
        }
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(GatewayKind::Card),
            "eft" => Ok(GatewayKind::Eft),
            "open_banking" => Ok(GatewayKind::OpenBanking),
            other => Err(format!("Unknown gateway: {}", other)),
        }
    }
}

/// Settlement status of a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    /// Terminal payments never change again; a webhook for one is a duplicate.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One settlement attempt for a Transaction through a specific gateway.
///
/// The idempotency key for reconciliation is `(gateway, external_id)`;
/// a duplicate webhook for the same pair must be a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub transaction_id: TransactionId,
    pub gateway: GatewayKind,
    /// Identifier assigned by the provider, known after initiation.
    pub external_id: Option<String>,
    pub status: PaymentStatus,
    pub amount: Money,
    /// Opaque provider metadata, stored verbatim for audit.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending Payment for a Transaction.
    pub fn new(transaction_id: TransactionId, gateway: GatewayKind, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            transaction_id,
            gateway,
            external_id: None,
            status: PaymentStatus::Pending,
            amount,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a payment from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: PaymentId,
        transaction_id: TransactionId,
        gateway: GatewayKind,
        external_id: Option<String>,
        status: PaymentStatus,
        amount: Money,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            transaction_id,
            gateway,
            external_id,
            status,
            amount,
            metadata,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    #[test]
    fn test_new_payment_is_pending() {
        let amount = Money::new(51750, Currency::ZAR).unwrap();
        let payment = Payment::new(TransactionId::new(), GatewayKind::Card, amount);

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.external_id.is_none());
        assert!(!payment.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_gateway_kind_roundtrip() {
        assert_eq!(
            "open_banking".parse::<GatewayKind>().unwrap(),
            GatewayKind::OpenBanking
        );
        assert_eq!(GatewayKind::Eft.to_string(), "eft");
        assert!("paypal".parse::<GatewayKind>().is_err());
    }
}

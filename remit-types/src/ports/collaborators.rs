//! Ports onto subsystems the engine consumes but does not implement:
//! KYC, audit logging, and user notification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Verification level assigned by the KYC subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycTier {
    Unverified,
    Basic,
    Full,
}

/// What the KYC subsystem knows about a user, as consumed here.
#[derive(Debug, Clone, Copy)]
pub struct KycProfile {
    pub tier: KycTier,
    /// Monthly sending limit in minor units of the user's home currency.
    pub monthly_limit: i64,
    /// Amount already sent this month, minor units.
    pub monthly_used: i64,
    /// Days since the user registered, a risk signal.
    pub account_age_days: i64,
}

/// Read-only lookup into the KYC subsystem.
#[async_trait::async_trait]
pub trait KycDirectory: Send + Sync + 'static {
    async fn profile(&self, user_id: Uuid) -> Result<KycProfile, AppError>;
}

/// Append-only sink for security and compliance events.
///
/// The engine only writes; failures here must never fail the business
/// operation, so implementations swallow and log their own errors.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn write(&self, event_type: &str, payload: serde_json::Value);
}

/// Outbound user messaging (OTP delivery, receipts).
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, user_id: Uuid, template: &str, data: serde_json::Value);
}

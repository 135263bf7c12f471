//! Default implementations of the collaborator ports.
//!
//! KYC, audit, and notification are owned by other systems. These
//! stand-ins keep the engine runnable on its own: KYC answers from
//! environment-configured defaults, audit events go to structured logs,
//! and notifications are logged instead of delivered.

use async_trait::async_trait;
use uuid::Uuid;

use remit_types::{AppError, AuditSink, KycDirectory, KycProfile, KycTier, Notifier};

/// KYC lookup answering a fixed profile for every user.
pub struct StaticKycDirectory {
    profile: KycProfile,
}

impl StaticKycDirectory {
    pub fn from_env() -> Self {
        let tier = match std::env::var("KYC_DEFAULT_TIER").as_deref() {
            Ok("unverified") => KycTier::Unverified,
            Ok("basic") => KycTier::Basic,
            _ => KycTier::Full,
        };
        let monthly_limit = std::env::var("KYC_MONTHLY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000_000);

        Self {
            profile: KycProfile {
                tier,
                monthly_limit,
                monthly_used: 0,
                account_age_days: 365,
            },
        }
    }
}

#[async_trait]
impl KycDirectory for StaticKycDirectory {
    async fn profile(&self, _user_id: Uuid) -> Result<KycProfile, AppError> {
        Ok(self.profile)
    }
}

/// Audit sink writing structured events to the `audit` log target.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(&self, event_type: &str, payload: serde_json::Value) {
        tracing::info!(target: "audit", event_type, payload = %payload, "audit event");
    }
}

/// Notifier that logs instead of delivering.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, user_id: Uuid, template: &str, _data: serde_json::Value) {
        // Payload intentionally not logged: it can carry OTPs.
        tracing::info!(%user_id, template, "notification dispatched");
    }
}

//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (SQLite, in-memory test doubles) implement this trait.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    GatewayKind, Payment, PaymentId, PaymentStatus, Transaction, TransactionEvent, TransactionId,
    TransactionStatus,
};
use crate::error::RepoError;

/// Aggregated history used by the risk scorer; read-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserHistory {
    /// Transactions created inside the trailing risk window.
    pub recent_count: i64,
    /// Average send amount (minor units) across the user's transactions.
    pub average_amount: i64,
    /// Prior failed transactions, a fraud signal.
    pub failed_count: i64,
}

/// A device fingerprint previously seen for a user, with its last
/// observed location for velocity checks.
#[derive(Debug, Clone)]
pub struct KnownDevice {
    pub user_id: Uuid,
    pub fingerprint: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen_at: DateTime<Utc>,
}

/// The main repository port for the transfer engine.
///
/// All multi-row operations MUST be atomic. Implementations should use
/// database transactions so a failed creation leaves no partial record.
#[async_trait::async_trait]
pub trait TransferRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Persists a new PENDING transaction atomically.
    ///
    /// If the idempotency key is already taken, the previously persisted
    /// transaction is returned instead of creating a second one.
    async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction, RepoError>;

    async fn get_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, RepoError>;

    async fn find_by_idempotency_key(&self, key: &str)
    -> Result<Option<Transaction>, RepoError>;

    async fn list_transactions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Transaction>, RepoError>;

    /// Applies a status change guarded on the current status being PENDING,
    /// appending the event to the durable history in the same database
    /// transaction. Returns `false` (not an error) when the guard fails,
    /// so duplicate deliveries degrade to a logged no-op.
    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        failure_reason: Option<&str>,
        payment_reference: Option<&str>,
        event: &TransactionEvent,
    ) -> Result<bool, RepoError>;

    async fn list_events(&self, id: TransactionId)
    -> Result<Vec<TransactionEvent>, RepoError>;

    /// PENDING transactions created before the cutoff; reaper input.
    async fn list_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_payment(&self, payment: &Payment) -> Result<(), RepoError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepoError>;

    /// Reconciliation lookup by the webhook idempotency key.
    async fn find_payment_by_external(
        &self,
        gateway: GatewayKind,
        external_id: &str,
    ) -> Result<Option<Payment>, RepoError>;

    async fn list_payments_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<Payment>, RepoError>;

    /// Updates a payment guarded on the current status being PENDING.
    /// Returns `false` when the payment was already terminal.
    async fn update_payment(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        external_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────
    // Risk signals
    // ─────────────────────────────────────────────────────────────────────────

    /// History aggregates for the risk scorer, over the trailing window.
    async fn user_history(
        &self,
        user_id: Uuid,
        window_start: DateTime<Utc>,
    ) -> Result<UserHistory, RepoError>;

    async fn get_device(
        &self,
        user_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<KnownDevice>, RepoError>;

    /// Records (or refreshes) a device sighting after transaction creation.
    async fn upsert_device(&self, device: &KnownDevice) -> Result<(), RepoError>;
}

//! Database row structs and their conversions into domain types.
//!
//! SQLite stores everything as TEXT/INTEGER/REAL; rows come back
//! string-typed and are parsed into domain types here.

use sqlx::FromRow;

use remit_types::{
    Currency, GatewayKind, Money, Payment, PaymentId, PaymentStatus, Recipient, RepoError,
    Transaction, TransactionEvent, TransactionId, TransactionStatus,
};

/// Transaction row from the database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub user_id: String,
    pub recipient: String,
    pub send_amount: i64,
    pub send_currency: String,
    pub destination_currency: String,
    pub rate: f64,
    pub fee: i64,
    pub risk_score: f64,
    pub risk_factors: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub payment_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Transaction event row from the database.
#[derive(FromRow)]
pub struct DbTransactionEvent {
    pub transaction_id: String,
    pub from_status: String,
    pub to_status: String,
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: String,
}

/// Payment row from the database.
#[derive(FromRow)]
pub struct DbPayment {
    pub id: String,
    pub transaction_id: String,
    pub gateway: String,
    pub external_id: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Known device row from the database.
#[derive(FromRow)]
pub struct DbKnownDevice {
    pub user_id: String,
    pub fingerprint: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen_at: String,
}

/// History aggregates row.
#[derive(FromRow)]
pub struct DbUserHistory {
    pub recent_count: i64,
    pub average_amount: i64,
    pub failed_count: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

/// Timestamps are stored fixed-width (microseconds, trailing Z) so that
/// lexicographic TEXT comparison matches chronological order.
pub fn format_timestamp(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

pub fn parse_transaction_status(s: &str) -> Result<TransactionStatus, RepoError> {
    match s {
        "PENDING" => Ok(TransactionStatus::Pending),
        "COMPLETED" => Ok(TransactionStatus::Completed),
        "FAILED" => Ok(TransactionStatus::Failed),
        "CANCELLED" => Ok(TransactionStatus::Cancelled),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction status: {}",
            s
        ))),
    }
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, RepoError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "SUCCEEDED" => Ok(PaymentStatus::Succeeded),
        "FAILED" => Ok(PaymentStatus::Failed),
        _ => Err(RepoError::Database(format!("Unknown payment status: {}", s))),
    }
}

pub fn parse_gateway(s: &str) -> Result<GatewayKind, RepoError> {
    s.parse().map_err(|e: String| RepoError::Database(e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbTransaction {
    /// Convert a database row into a domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let send_currency = parse_currency(&self.send_currency)?;
        let send_amount = Money::new(self.send_amount, send_currency).map_err(RepoError::Domain)?;
        let fee = Money::new(self.fee, send_currency).map_err(RepoError::Domain)?;
        let recipient: Recipient = serde_json::from_str(&self.recipient)
            .map_err(|e| RepoError::Database(e.to_string()))?;
        let risk_factors: Vec<String> = serde_json::from_str(&self.risk_factors)
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(Transaction::from_parts(
            TransactionId::from_uuid(parse_uuid(&self.id)?),
            parse_uuid(&self.user_id)?,
            recipient,
            send_amount,
            parse_currency(&self.destination_currency)?,
            self.rate,
            fee,
            self.risk_score,
            risk_factors,
            parse_transaction_status(&self.status)?,
            self.failure_reason,
            self.payment_reference,
            self.idempotency_key,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}

impl DbTransactionEvent {
    pub fn into_domain(self) -> Result<TransactionEvent, RepoError> {
        Ok(TransactionEvent {
            transaction_id: TransactionId::from_uuid(parse_uuid(&self.transaction_id)?),
            from_status: parse_transaction_status(&self.from_status)?,
            to_status: parse_transaction_status(&self.to_status)?,
            actor: self.actor,
            reason: self.reason,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl DbPayment {
    pub fn into_domain(self) -> Result<Payment, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;
        let metadata: serde_json::Value = serde_json::from_str(&self.metadata)
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(Payment::from_parts(
            PaymentId::from_uuid(parse_uuid(&self.id)?),
            TransactionId::from_uuid(parse_uuid(&self.transaction_id)?),
            parse_gateway(&self.gateway)?,
            self.external_id,
            parse_payment_status(&self.status)?,
            amount,
            metadata,
            parse_timestamp(&self.created_at)?,
            parse_timestamp(&self.updated_at)?,
        ))
    }
}

impl DbKnownDevice {
    pub fn into_domain(self) -> Result<remit_types::KnownDevice, RepoError> {
        Ok(remit_types::KnownDevice {
            user_id: parse_uuid(&self.user_id)?,
            fingerprint: self.fingerprint,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            last_seen_at: parse_timestamp(&self.last_seen_at)?,
        })
    }
}

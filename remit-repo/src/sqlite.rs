//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use remit_types::{
    GatewayKind, KnownDevice, Payment, PaymentId, PaymentStatus, RepoError, Transaction,
    TransactionEvent, TransactionId, TransactionStatus, TransferRepository, UserHistory,
};

use crate::types::{
    DbKnownDevice, DbPayment, DbTransaction, DbTransactionEvent, DbUserHistory, format_timestamp,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const TRANSACTION_COLUMNS: &str = "id, user_id, recipient, send_amount, send_currency, \
     destination_currency, rate, fee, risk_score, risk_factors, status, failure_reason, \
     payment_reference, idempotency_key, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, transaction_id, gateway, external_id, status, amount, currency, metadata, \
     created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransferRepository for SqliteRepo {
    async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction, RepoError> {
        let recipient = serde_json::to_string(&tx.recipient)
            .map_err(|e| RepoError::Database(e.to_string()))?;
        let risk_factors = serde_json::to_string(&tx.risk_factors)
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO transactions
               (id, user_id, recipient, send_amount, send_currency, destination_currency,
                rate, fee, risk_score, risk_factors, status, failure_reason,
                payment_reference, idempotency_key, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.id.to_string())
        .bind(tx.user_id.to_string())
        .bind(&recipient)
        .bind(tx.send_amount.amount())
        .bind(tx.send_amount.currency().to_string())
        .bind(tx.destination_currency.to_string())
        .bind(tx.rate)
        .bind(tx.fee.amount())
        .bind(tx.risk_score)
        .bind(&risk_factors)
        .bind(tx.status.as_str())
        .bind(&tx.failure_reason)
        .bind(&tx.payment_reference)
        .bind(&tx.idempotency_key)
        .bind(format_timestamp(tx.created_at))
        .bind(format_timestamp(tx.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(tx.clone()),
            Err(e) => {
                // A racing create with the same idempotency key loses the
                // UNIQUE constraint; return the winner's row.
                let unique_violation = e
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    if let Some(key) = tx.idempotency_key.as_deref() {
                        if let Some(existing) = self.find_by_idempotency_key(key).await? {
                            return Ok(existing);
                        }
                    }
                    return Err(RepoError::Conflict("transaction already exists".into()));
                }
                Err(RepoError::Database(e.to_string()))
            }
        }
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE idempotency_key = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn list_transactions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY created_at DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        failure_reason: Option<&str>,
        payment_reference: Option<&str>,
        event: &TransactionEvent,
    ) -> Result<bool, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Guarded on the current status: a transaction that already left
        // PENDING is terminal and must not change again.
        let result = sqlx::query(
            r#"UPDATE transactions
               SET status = ?, failure_reason = ?,
                   payment_reference = COALESCE(?, payment_reference), updated_at = ?
               WHERE id = ? AND status = 'PENDING'"#,
        )
        .bind(status.as_str())
        .bind(failure_reason)
        .bind(payment_reference)
        .bind(format_timestamp(event.created_at))
        .bind(id.to_string())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"INSERT INTO transaction_events
               (transaction_id, from_status, to_status, actor, reason, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(event.transaction_id.to_string())
        .bind(event.from_status.as_str())
        .bind(event.to_status.as_str())
        .bind(&event.actor)
        .bind(&event.reason)
        .bind(format_timestamp(event.created_at))
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(true)
    }

    async fn list_events(
        &self,
        id: TransactionId,
    ) -> Result<Vec<TransactionEvent>, RepoError> {
        let rows: Vec<DbTransactionEvent> = sqlx::query_as(
            r#"SELECT transaction_id, from_status, to_status, actor, reason, created_at
               FROM transaction_events WHERE transaction_id = ?
               ORDER BY id ASC"#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(DbTransactionEvent::into_domain)
            .collect()
    }

    async fn list_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, RepoError> {
        let rows: Vec<DbTransaction> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE status = 'PENDING' AND created_at < ?",
            TRANSACTION_COLUMNS
        ))
        .bind(format_timestamp(cutoff))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTransaction::into_domain).collect()
    }

    async fn create_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO payments
               (id, transaction_id, gateway, external_id, status, amount, currency,
                metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(payment.id.to_string())
        .bind(payment.transaction_id.to_string())
        .bind(payment.gateway.as_str())
        .bind(&payment.external_id)
        .bind(payment.status.as_str())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().to_string())
        .bind(payment.metadata.to_string())
        .bind(format_timestamp(payment.created_at))
        .bind(format_timestamp(payment.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn find_payment_by_external(
        &self,
        gateway: GatewayKind,
        external_id: &str,
    ) -> Result<Option<Payment>, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE gateway = ? AND external_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(gateway.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn list_payments_for_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<Payment>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE transaction_id = ? ORDER BY created_at ASC",
            PAYMENT_COLUMNS
        ))
        .bind(transaction_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn update_payment(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        external_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<bool, RepoError> {
        // Guarded like transactions: terminal payments never change.
        let result = sqlx::query(
            r#"UPDATE payments
               SET status = ?, external_id = COALESCE(?, external_id),
                   metadata = ?, updated_at = ?
               WHERE id = ? AND status = 'PENDING'"#,
        )
        .bind(status.as_str())
        .bind(external_id)
        .bind(metadata.to_string())
        .bind(format_timestamp(Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_history(
        &self,
        user_id: Uuid,
        window_start: DateTime<Utc>,
    ) -> Result<UserHistory, RepoError> {
        let user_id_str = user_id.to_string();

        let row: DbUserHistory = sqlx::query_as(
            r#"SELECT
                 (SELECT COUNT(*) FROM transactions
                    WHERE user_id = ?1 AND created_at >= ?2) AS recent_count,
                 (SELECT CAST(COALESCE(AVG(send_amount), 0) AS INTEGER) FROM transactions
                    WHERE user_id = ?1) AS average_amount,
                 (SELECT COUNT(*) FROM transactions
                    WHERE user_id = ?1 AND status = 'FAILED') AS failed_count"#,
        )
        .bind(&user_id_str)
        .bind(format_timestamp(window_start))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(UserHistory {
            recent_count: row.recent_count,
            average_amount: row.average_amount,
            failed_count: row.failed_count,
        })
    }

    async fn get_device(
        &self,
        user_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<KnownDevice>, RepoError> {
        let row: Option<DbKnownDevice> = sqlx::query_as(
            r#"SELECT user_id, fingerprint, country, latitude, longitude, last_seen_at
               FROM known_devices WHERE user_id = ? AND fingerprint = ?"#,
        )
        .bind(user_id.to_string())
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbKnownDevice::into_domain).transpose()
    }

    async fn upsert_device(&self, device: &KnownDevice) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO known_devices
               (user_id, fingerprint, country, latitude, longitude, last_seen_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (user_id, fingerprint) DO UPDATE SET
                 country = excluded.country,
                 latitude = excluded.latitude,
                 longitude = excluded.longitude,
                 last_seen_at = excluded.last_seen_at"#,
        )
        .bind(device.user_id.to_string())
        .bind(&device.fingerprint)
        .bind(&device.country)
        .bind(device.latitude)
        .bind(device.longitude)
        .bind(format_timestamp(device.last_seen_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

//! Transaction aggregate and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Currency, Money};
use super::payment::GatewayKind;

/// Unique identifier for a Transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random TransactionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Who the money goes to: a registered user or an external email identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Recipient {
    User(Uuid),
    Email(String),
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::User(id) => write!(f, "user:{}", id),
            Recipient::Email(email) => write!(f, "email:{}", email),
        }
    }
}

/// Lifecycle status of a Transaction.
///
/// `PENDING -> COMPLETED | FAILED | CANCELLED`; the latter three are
/// terminal and permit no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    /// True for states from which no transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The party responsible for a state transition, recorded for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    /// The owning user acted (e.g. cancelled).
    User(Uuid),
    /// A gateway webhook drove the transition.
    Gateway(GatewayKind),
    /// The timeout reaper swept a stale pending transaction.
    Reaper,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{}", id),
            Actor::Gateway(kind) => write!(f, "gateway:{}", kind),
            Actor::Reaper => write!(f, "reaper"),
        }
    }
}

/// A requested state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Settlement confirmed; carries the gateway reference of the
    /// successful Payment.
    Complete { payment_reference: String },
    Fail { reason: String },
    Cancel,
}

impl Transition {
    /// The status this transition targets.
    pub fn target(&self) -> TransactionStatus {
        match self {
            Transition::Complete { .. } => TransactionStatus::Completed,
            Transition::Fail { .. } => TransactionStatus::Failed,
            Transition::Cancel => TransactionStatus::Cancelled,
        }
    }
}

/// One applied transition, appended to the transaction's durable history.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TransactionEvent {
    pub transaction_id: TransactionId,
    pub from_status: TransactionStatus,
    pub to_status: TransactionStatus,
    /// Serialized Actor, e.g. `gateway:card` or `reaper`.
    pub actor: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The persisted aggregate root of the engine.
///
/// The rate and fee are frozen from the Quote at creation and never
/// recomputed. Once a terminal status is reached no field mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: Uuid,
    pub recipient: Recipient,
    pub send_amount: Money,
    pub destination_currency: Currency,
    /// Rate snapshot from the quote, source units per destination unit.
    pub rate: f64,
    /// Total fee in the send currency, from the quote's breakdown.
    pub fee: Money,
    pub risk_score: f64,
    /// Ordered contributing factor codes from the risk assessment.
    pub risk_factors: Vec<String>,
    pub status: TransactionStatus,
    pub failure_reason: Option<String>,
    /// Gateway reference of the successful Payment, set on completion.
    pub payment_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Reconstructs a transaction from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        user_id: Uuid,
        recipient: Recipient,
        send_amount: Money,
        destination_currency: Currency,
        rate: f64,
        fee: Money,
        risk_score: f64,
        risk_factors: Vec<String>,
        status: TransactionStatus,
        failure_reason: Option<String>,
        payment_reference: Option<String>,
        idempotency_key: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            recipient,
            send_amount,
            destination_currency,
            rate,
            fee,
            risk_score,
            risk_factors,
            status,
            failure_reason,
            payment_reference,
            idempotency_key,
            created_at,
            updated_at,
        }
    }

    /// Total amount the sender pays: send_amount + fee.
    ///
    /// Construction guarantees both share the send currency; a mismatch
    /// here is a corrupted Transaction and must not be papered over.
    pub fn total_cost(&self) -> Money {
        self.send_amount
            .checked_add(self.fee)
            .expect("send amount and fee carry the same currency")
    }

    /// Applies a transition, returning the event to append to history.
    ///
    /// A transition requested against a terminal status returns `Ok(None)`
    /// rather than an error: duplicate webhook delivery must be tolerated
    /// as a no-op, and the caller logs a warning. Terminal-state fields are
    /// left untouched in that case.
    pub fn apply(
        &mut self,
        transition: Transition,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Option<TransactionEvent> {
        if self.status.is_terminal() {
            return None;
        }

        let from_status = self.status;
        let to_status = transition.target();
        let mut reason = None;

        match transition {
            Transition::Complete { payment_reference } => {
                self.payment_reference = Some(payment_reference);
            }
            Transition::Fail { reason: r } => {
                self.failure_reason = Some(r.clone());
                reason = Some(r);
            }
            Transition::Cancel => {}
        }

        self.status = to_status;
        self.updated_at = now;

        Some(TransactionEvent {
            transaction_id: self.id,
            from_status,
            to_status,
            actor: actor.to_string(),
            reason,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_transaction() -> Transaction {
        let now = Utc::now();
        Transaction::from_parts(
            TransactionId::new(),
            Uuid::new_v4(),
            Recipient::Email("recipient@example.com".into()),
            Money::new(50000, Currency::ZAR).unwrap(),
            Currency::USD,
            17.845,
            Money::new(1750, Currency::ZAR).unwrap(),
            12.0,
            vec![],
            TransactionStatus::Pending,
            None,
            None,
            Some("idem-1".into()),
            now,
            now,
        )
    }

    #[test]
    fn test_complete_from_pending() {
        let mut tx = pending_transaction();
        let event = tx
            .apply(
                Transition::Complete {
                    payment_reference: "pay_abc".into(),
                },
                &Actor::Gateway(GatewayKind::Card),
                Utc::now(),
            )
            .expect("transition should apply");

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.payment_reference.as_deref(), Some("pay_abc"));
        assert_eq!(event.from_status, TransactionStatus::Pending);
        assert_eq!(event.to_status, TransactionStatus::Completed);
        assert_eq!(event.actor, "gateway:card");
    }

    #[test]
    fn test_fail_records_reason() {
        let mut tx = pending_transaction();
        let event = tx
            .apply(
                Transition::Fail {
                    reason: "timeout".into(),
                },
                &Actor::Reaper,
                Utc::now(),
            )
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.failure_reason.as_deref(), Some("timeout"));
        assert_eq!(event.reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_terminal_state_is_frozen() {
        let mut tx = pending_transaction();
        tx.apply(
            Transition::Complete {
                payment_reference: "pay_abc".into(),
            },
            &Actor::Gateway(GatewayKind::Card),
            Utc::now(),
        )
        .unwrap();

        let before = tx.clone();
        let result = tx.apply(
            Transition::Fail {
                reason: "late webhook".into(),
            },
            &Actor::Gateway(GatewayKind::Card),
            Utc::now(),
        );

        assert!(result.is_none());
        assert_eq!(tx.status, before.status);
        assert_eq!(tx.payment_reference, before.payment_reference);
        assert_eq!(tx.failure_reason, before.failure_reason);
        assert_eq!(tx.updated_at, before.updated_at);
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let mut tx = pending_transaction();
        assert!(tx.apply(Transition::Cancel, &Actor::User(tx.user_id), Utc::now()).is_some());
        assert_eq!(tx.status, TransactionStatus::Cancelled);

        // Cancelled is terminal too.
        assert!(tx
            .apply(
                Transition::Complete {
                    payment_reference: "pay_late".into()
                },
                &Actor::Gateway(GatewayKind::Eft),
                Utc::now()
            )
            .is_none());
    }

    #[test]
    fn test_total_cost() {
        let tx = pending_transaction();
        assert_eq!(tx.total_cost().amount(), 51750);
    }
}

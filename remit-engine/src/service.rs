//! Transfer application service.
//!
//! Orchestrates quoting, risk screening, the transaction lifecycle, and
//! payment initiation through the repository and gateway ports. Contains
//! no infrastructure logic.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::Rng as _;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use remit_gateways::{retry, GatewayRegistry, RetryPolicy};
use remit_types::{
    Actor, AppError, AuditSink, CreateTransactionRequest, DeviceContext, KnownDevice,
    KycDirectory, Notifier, Payment, PaymentRequest, PaymentStatus, ProcessPaymentRequest, Quote,
    QuoteRequest, Recipient, RiskTier, Transaction, TransactionEvent, TransactionId,
    TransactionStatus, TransferRepository, Transition,
};

use crate::quotes::QuoteService;
use crate::risk::{RiskScorer, UserContext};

/// Outcome of a transaction creation attempt.
pub enum CreateOutcome {
    /// Persisted as PENDING (or returned from a prior idempotent call).
    Created(Transaction),
    /// Held for step-up verification; nothing persisted yet.
    VerificationRequired {
        transaction_id: TransactionId,
        token: String,
        expires_in_secs: u64,
    },
}

/// A medium-risk transfer candidate held until the user verifies.
struct HeldCandidate {
    transaction: Transaction,
    device: DeviceContext,
    otp: String,
    expires_at: chrono::DateTime<Utc>,
}

/// Application service for money transfers.
///
/// Generic over `R: TransferRepository` - the persistence adapter is
/// injected at compile time, so tests run against an in-memory repo.
pub struct TransferService<R: TransferRepository> {
    repo: Arc<R>,
    quotes: QuoteService,
    scorer: RiskScorer,
    gateways: GatewayRegistry,
    retry: RetryPolicy,
    kyc: Arc<dyn KycDirectory>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    /// Candidates awaiting OTP verification, keyed by one-time token.
    held: DashMap<String, HeldCandidate>,
    verification_ttl: Duration,
}

impl<R: TransferRepository> TransferService<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<R>,
        quotes: QuoteService,
        scorer: RiskScorer,
        gateways: GatewayRegistry,
        retry: RetryPolicy,
        kyc: Arc<dyn KycDirectory>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        verification_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            quotes,
            scorer,
            gateways,
            retry,
            kyc,
            audit,
            notifier,
            held: DashMap::new(),
            verification_ttl,
        }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Quotes
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_quote(&self, req: &QuoteRequest) -> Result<Quote, AppError> {
        self.quotes.quote(req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction creation and verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Commits a quote into a transaction, screening it first.
    ///
    /// LOW risk persists immediately; MEDIUM holds the candidate behind
    /// an OTP; HIGH is rejected and the factor detail goes to the audit
    /// sink only.
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        req: CreateTransactionRequest,
    ) -> Result<CreateOutcome, AppError> {
        // Idempotent replay: same key returns the original transaction.
        if let Some(key) = req.idempotency_key.as_deref() {
            if let Some(existing) = self.repo.find_by_idempotency_key(key).await? {
                tracing::info!(transaction_id = %existing.id, "idempotent replay of create");
                return Ok(CreateOutcome::Created(existing));
            }
        }

        let quote = match self.quotes.take(req.quote_id) {
            Ok(quote) => quote,
            Err(err) => {
                // A concurrent call carrying the same key may have
                // consumed the quote and persisted first; answer with
                // its transaction instead of a spurious 410.
                if let Some(key) = req.idempotency_key.as_deref() {
                    if let Some(existing) = self.repo.find_by_idempotency_key(key).await? {
                        tracing::info!(
                            transaction_id = %existing.id,
                            "idempotent replay after losing the quote race"
                        );
                        return Ok(CreateOutcome::Created(existing));
                    }
                }
                return Err(err);
            }
        };
        self.validate_recipient(user_id, &req.recipient)?;

        let assessment = self.screen(user_id, &quote, &req.device).await?;
        let now = Utc::now();
        let transaction = Transaction::from_parts(
            TransactionId::new(),
            user_id,
            req.recipient,
            quote.send_amount,
            quote.to_currency,
            quote.rate.rate,
            quote.fee.total(),
            assessment.score,
            assessment.factor_codes(),
            TransactionStatus::Pending,
            None,
            None,
            req.idempotency_key,
            now,
            now,
        );

        match assessment.tier {
            RiskTier::High => {
                self.audit
                    .write(
                        "risk.blocked",
                        serde_json::json!({
                            "user_id": user_id,
                            "score": assessment.score,
                            "factors": assessment.factors,
                            "send_amount": quote.send_amount.amount(),
                            "currency": quote.from_currency,
                        }),
                    )
                    .await;
                tracing::warn!(%user_id, score = assessment.score, "transfer blocked by risk screening");
                Err(AppError::FraudBlocked)
            }
            RiskTier::Medium => {
                let token = random_token();
                let otp = random_otp();
                self.notifier
                    .send(
                        user_id,
                        "transfer_verification",
                        serde_json::json!({ "otp": otp }),
                    )
                    .await;
                self.audit
                    .write(
                        "risk.verification_required",
                        serde_json::json!({
                            "user_id": user_id,
                            "transaction_id": transaction.id,
                            "score": assessment.score,
                            "factors": assessment.factors,
                        }),
                    )
                    .await;

                let transaction_id = transaction.id;
                self.held.retain(|_, c| c.expires_at > now);
                self.held.insert(
                    token.clone(),
                    HeldCandidate {
                        transaction,
                        device: req.device,
                        otp,
                        expires_at: now + self.verification_ttl,
                    },
                );

                Ok(CreateOutcome::VerificationRequired {
                    transaction_id,
                    token,
                    expires_in_secs: self.verification_ttl.num_seconds().max(0) as u64,
                })
            }
            RiskTier::Low => {
                let persisted = self.persist(transaction, &req.device).await?;
                Ok(CreateOutcome::Created(persisted))
            }
        }
    }

    /// Completes step-up verification of a held transfer.
    pub async fn verify_transaction(
        &self,
        user_id: Uuid,
        transaction_id: TransactionId,
        token: &str,
        otp: &str,
    ) -> Result<Transaction, AppError> {
        let now = Utc::now();
        {
            let candidate = self.held.get(token).ok_or(AppError::VerificationExpired)?;
            if candidate.expires_at <= now {
                drop(candidate);
                self.held.remove(token);
                return Err(AppError::VerificationExpired);
            }
            if candidate.transaction.user_id != user_id
                || candidate.transaction.id != transaction_id
            {
                return Err(AppError::VerificationExpired);
            }
            let matches: bool = candidate
                .otp
                .as_bytes()
                .ct_eq(otp.as_bytes())
                .into();
            if !matches {
                return Err(AppError::Validation("incorrect verification code".into()));
            }
        }

        // Token consumed only after the OTP checks out.
        let (_, candidate) = self
            .held
            .remove(token)
            .ok_or(AppError::VerificationExpired)?;
        let persisted = self.persist(candidate.transaction, &candidate.device).await?;
        Ok(persisted)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    /// Initiates settlement of a pending transaction through a gateway.
    ///
    /// Idempotent: an existing in-flight payment for the transaction is
    /// returned instead of initiating a second charge. Initiation
    /// failure marks the Payment FAILED but leaves the Transaction
    /// PENDING so the user can retry with another gateway.
    pub async fn process_payment(
        &self,
        user_id: Uuid,
        transaction_id: TransactionId,
        req: ProcessPaymentRequest,
    ) -> Result<Payment, AppError> {
        let transaction = self.owned_transaction(user_id, transaction_id).await?;
        if transaction.status != TransactionStatus::Pending {
            return Err(AppError::Validation(format!(
                "transaction is {}, not open for payment",
                transaction.status
            )));
        }

        let existing = self.repo.list_payments_for_transaction(transaction_id).await?;
        if let Some(in_flight) = existing.iter().find(|p| !p.status.is_terminal()) {
            tracing::info!(payment_id = %in_flight.id, "payment already in flight");
            return Ok(in_flight.clone());
        }

        let gateway = self
            .gateways
            .get(req.gateway)
            .ok_or_else(|| AppError::Validation(format!("gateway {} not configured", req.gateway)))?;

        let total = transaction.total_cost();
        if !gateway.supports(total.currency()) {
            return Err(AppError::UnsupportedGatewayCurrency {
                gateway: req.gateway,
                currency: total.currency(),
            });
        }

        let mut payment = Payment::new(transaction_id, req.gateway, total);
        self.repo.create_payment(&payment).await?;

        let request = PaymentRequest {
            payment_id: payment.id,
            transaction_id,
            amount: total,
            idempotency_key: payment.id.to_string(),
            fields: req.fields,
        };

        match retry::with_backoff(self.retry, || gateway.initiate(&request)).await {
            Ok(handle) => {
                self.repo
                    .update_payment(
                        payment.id,
                        handle.status,
                        Some(&handle.external_id),
                        &handle.metadata,
                    )
                    .await?;
                payment.status = handle.status;
                payment.external_id = Some(handle.external_id);
                payment.metadata = handle.metadata;
                self.audit
                    .write(
                        "payment.initiated",
                        serde_json::json!({
                            "payment_id": payment.id,
                            "transaction_id": transaction_id,
                            "gateway": req.gateway,
                        }),
                    )
                    .await;
                Ok(payment)
            }
            Err(err) => {
                let metadata = serde_json::json!({ "error": err.to_string() });
                self.repo
                    .update_payment(payment.id, PaymentStatus::Failed, None, &metadata)
                    .await?;
                tracing::warn!(payment_id = %payment.id, error = %err, "payment initiation failed");
                Err(err.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Cancels a pending transaction. Refused while a payment is in
    /// flight: the webhook must settle it first.
    pub async fn cancel_transaction(
        &self,
        user_id: Uuid,
        transaction_id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let mut transaction = self.owned_transaction(user_id, transaction_id).await?;

        let payments = self.repo.list_payments_for_transaction(transaction_id).await?;
        if payments.iter().any(|p| p.status == PaymentStatus::Pending) {
            return Err(AppError::Validation(
                "a payment is in flight; wait for it to settle".into(),
            ));
        }

        let actor = Actor::User(user_id);
        let event = transaction
            .apply(Transition::Cancel, &actor, Utc::now())
            .ok_or_else(|| AppError::Validation("transaction already finalized".into()))?;

        self.apply_guarded(&transaction, &event).await?;
        Ok(transaction)
    }

    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: TransactionId,
    ) -> Result<(Transaction, Vec<TransactionEvent>), AppError> {
        let transaction = self.owned_transaction(user_id, transaction_id).await?;
        let history = self.repo.list_events(transaction_id).await?;
        Ok((transaction, history))
    }

    pub async fn list_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions_for_user(user_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn validate_recipient(&self, user_id: Uuid, recipient: &Recipient) -> Result<(), AppError> {
        match recipient {
            Recipient::User(id) if *id == user_id => Err(AppError::Validation(
                "cannot send money to yourself".into(),
            )),
            Recipient::Email(email) if !email.contains('@') => {
                Err(AppError::Validation("invalid recipient email".into()))
            }
            _ => Ok(()),
        }
    }

    async fn screen(
        &self,
        user_id: Uuid,
        quote: &Quote,
        device: &DeviceContext,
    ) -> Result<remit_types::RiskAssessment, AppError> {
        let window_start =
            Utc::now() - Duration::days(self.scorer.config().history_window_days);
        let history = self.repo.user_history(user_id, window_start).await?;
        let kyc = self.kyc.profile(user_id).await?;
        let known_device = self.repo.get_device(user_id, &device.fingerprint).await?;

        let user_ctx = UserContext {
            history,
            kyc,
            known_device,
        };
        Ok(self
            .scorer
            .assess(quote.send_amount, &user_ctx, device, Utc::now()))
    }

    async fn persist(
        &self,
        transaction: Transaction,
        device: &DeviceContext,
    ) -> Result<Transaction, AppError> {
        let persisted = self.repo.create_transaction(&transaction).await?;

        self.repo
            .upsert_device(&KnownDevice {
                user_id: persisted.user_id,
                fingerprint: device.fingerprint.clone(),
                country: device.ip_country.clone(),
                latitude: device.latitude,
                longitude: device.longitude,
                last_seen_at: Utc::now(),
            })
            .await?;

        self.audit
            .write(
                "transaction.created",
                serde_json::json!({
                    "transaction_id": persisted.id,
                    "user_id": persisted.user_id,
                    "send_amount": persisted.send_amount.amount(),
                    "currency": persisted.send_amount.currency(),
                    "risk_score": persisted.risk_score,
                }),
            )
            .await;
        tracing::info!(transaction_id = %persisted.id, "transaction created");
        Ok(persisted)
    }

    async fn owned_transaction(
        &self,
        user_id: Uuid,
        transaction_id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let transaction = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction {}", transaction_id)))?;
        // Other users' transactions are indistinguishable from absent ones.
        if transaction.user_id != user_id {
            return Err(AppError::NotFound(format!("Transaction {}", transaction_id)));
        }
        Ok(transaction)
    }

    async fn apply_guarded(
        &self,
        transaction: &Transaction,
        event: &TransactionEvent,
    ) -> Result<(), AppError> {
        let applied = self
            .repo
            .update_transaction_status(
                transaction.id,
                transaction.status,
                transaction.failure_reason.as_deref(),
                transaction.payment_reference.as_deref(),
                event,
            )
            .await?;
        if !applied {
            tracing::warn!(
                transaction_id = %transaction.id,
                target = %transaction.status,
                "transition lost the guard race, treating as no-op"
            );
        }
        Ok(())
    }
}

fn random_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn random_otp() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

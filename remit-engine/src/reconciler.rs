//! Webhook reconciliation.
//!
//! Gateways confirm settlement asynchronously. The reconciler verifies
//! the provider signature, normalizes the payload, and drives the
//! Payment and its Transaction forward. Handling is serialized per
//! payment so racing deliveries cannot interleave, and duplicate
//! deliveries degrade to logged no-ops.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use remit_gateways::GatewayRegistry;
use remit_types::{
    Actor, AppError, AuditSink, GatewayKind, Payment, PaymentStatus, TransferRepository,
    Transition, WebhookNotice,
};

pub struct WebhookReconciler<R: TransferRepository> {
    repo: Arc<R>,
    gateways: GatewayRegistry,
    audit: Arc<dyn AuditSink>,
    /// Per-payment locks serializing concurrent webhook deliveries.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<R: TransferRepository> WebhookReconciler<R> {
    pub fn new(repo: Arc<R>, gateways: GatewayRegistry, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            repo,
            gateways,
            audit,
            locks: DashMap::new(),
        }
    }

    /// Handles one raw webhook delivery.
    ///
    /// Returns `Ok(())` for everything the provider should not retry:
    /// successful reconciliation, duplicates, unknown payments, and
    /// unparseable payloads. Only a bad signature is an error, so the
    /// HTTP layer answers 401 and nothing else but 200.
    pub async fn handle(
        &self,
        gateway_kind: GatewayKind,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), AppError> {
        let gateway = self.gateways.get(gateway_kind).ok_or_else(|| {
            AppError::NotFound(format!("gateway {} not configured", gateway_kind))
        })?;

        if !gateway.verify_signature(payload, signature) {
            self.audit
                .write(
                    "webhook.invalid_signature",
                    serde_json::json!({
                        "gateway": gateway_kind,
                        "payload_bytes": payload.len(),
                    }),
                )
                .await;
            tracing::warn!(gateway = %gateway_kind, "webhook signature verification failed");
            return Err(AppError::InvalidSignature);
        }

        let notice = match gateway.parse_webhook(payload) {
            Ok(notice) => notice,
            Err(err) => {
                // Malformed but authentic: absorb so the provider stops
                // retrying, and leave a trace for investigation.
                tracing::warn!(gateway = %gateway_kind, error = %err, "unparseable webhook absorbed");
                return Ok(());
            }
        };

        let Some(payment) = self
            .repo
            .find_payment_by_external(gateway_kind, &notice.external_id)
            .await?
        else {
            tracing::info!(
                gateway = %gateway_kind,
                external_id = %notice.external_id,
                "webhook for unknown payment absorbed"
            );
            return Ok(());
        };

        let payment_id = payment.id;
        let lock = self
            .locks
            .entry(*payment_id.as_uuid())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            // Re-read under the lock; a racing delivery may have settled it.
            match self.repo.get_payment(payment_id).await {
                Ok(Some(payment)) => self.reconcile(payment, &notice, gateway_kind).await,
                Ok(None) => Ok(()),
                Err(e) => Err(e.into()),
            }
        };
        drop(lock);
        // Evict the entry unless another delivery still holds a clone,
        // so the map does not grow with every payment ever settled.
        self.locks
            .remove_if(payment_id.as_uuid(), |_, l| Arc::strong_count(l) == 1);
        outcome
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }

    async fn reconcile(
        &self,
        payment: Payment,
        notice: &WebhookNotice,
        gateway_kind: GatewayKind,
    ) -> Result<(), AppError> {
        if payment.status.is_terminal() {
            tracing::warn!(
                payment_id = %payment.id,
                status = %payment.status,
                "duplicate webhook for settled payment, no-op"
            );
            return Ok(());
        }

        if notice.amount != payment.amount.amount() {
            tracing::warn!(
                payment_id = %payment.id,
                expected = payment.amount.amount(),
                reported = notice.amount,
                "webhook amount differs from initiated amount"
            );
        }

        let metadata = serde_json::json!({
            "reported_amount": notice.amount,
            "reported_currency": notice.currency,
        });
        let updated = self
            .repo
            .update_payment(payment.id, notice.status, Some(&notice.external_id), &metadata)
            .await?;
        if !updated {
            tracing::warn!(payment_id = %payment.id, "payment already settled by a racing delivery");
            return Ok(());
        }

        self.drive_transaction(&payment, notice, gateway_kind).await
    }

    async fn drive_transaction(
        &self,
        payment: &Payment,
        notice: &WebhookNotice,
        gateway_kind: GatewayKind,
    ) -> Result<(), AppError> {
        let Some(mut transaction) = self.repo.get_transaction(payment.transaction_id).await? else {
            tracing::error!(
                payment_id = %payment.id,
                transaction_id = %payment.transaction_id,
                "payment references a missing transaction"
            );
            return Ok(());
        };

        let transition = match notice.status {
            PaymentStatus::Succeeded => Transition::Complete {
                payment_reference: notice.external_id.clone(),
            },
            PaymentStatus::Failed => Transition::Fail {
                reason: "gateway reported failure".into(),
            },
            PaymentStatus::Pending => return Ok(()),
        };

        let actor = Actor::Gateway(gateway_kind);
        let Some(event) = transaction.apply(transition, &actor, Utc::now()) else {
            tracing::warn!(
                transaction_id = %transaction.id,
                "webhook arrived after transaction settled, no-op"
            );
            return Ok(());
        };

        let applied = self
            .repo
            .update_transaction_status(
                transaction.id,
                transaction.status,
                transaction.failure_reason.as_deref(),
                transaction.payment_reference.as_deref(),
                &event,
            )
            .await?;
        if !applied {
            tracing::warn!(transaction_id = %transaction.id, "transition lost the guard race");
            return Ok(());
        }

        self.audit
            .write(
                "transaction.settled",
                serde_json::json!({
                    "transaction_id": transaction.id,
                    "status": transaction.status,
                    "payment_id": payment.id,
                    "gateway": gateway_kind,
                }),
            )
            .await;
        tracing::info!(
            transaction_id = %transaction.id,
            status = %transaction.status,
            "transaction settled from webhook"
        );
        Ok(())
    }
}

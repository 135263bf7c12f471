//! EFT (bank transfer) adapter.
//!
//! The EFT provider settles asynchronously over interbank rails and
//! notifies with `{"reference", "state", "amount", "currency"}` webhooks
//! where state is `SETTLED` or `RETURNED`.

use remit_types::{
    Currency, GatewayConfig, GatewayError, GatewayKind, PaymentGateway, PaymentHandle,
    PaymentRequest, PaymentStatus, WebhookNotice,
};
use serde::Deserialize;

use crate::signature;

pub struct EftGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    reference: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct EftWebhook {
    reference: String,
    state: String,
    amount: i64,
    currency: String,
}

impl EftGateway {
    pub fn new(config: GatewayConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for EftGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Eft
    }

    fn supported_currencies(&self) -> &[Currency] {
        &self.config.currencies
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentHandle, GatewayError> {
        let url = format!("{}/transfers", self.config.endpoint);
        let body = serde_json::json!({
            "amount": request.amount.amount(),
            "currency": request.amount.currency().to_string(),
            "narrative": request.transaction_id.to_string(),
            "account": request.fields,
        });

        let response = self
            .client
            .post(&url)
            .header("Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Declined(format!(
                "eft transfer rejected ({}): {}",
                status, detail
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "eft provider returned {}",
                status
            )));
        }

        let transfer: TransferResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        tracing::info!(external_id = %transfer.reference, "eft transfer initiated");

        let metadata = serde_json::json!({ "provider_state": transfer.state });
        Ok(PaymentHandle {
            external_id: transfer.reference,
            status: PaymentStatus::Pending,
            metadata,
        })
    }

    fn verify_signature(&self, payload: &[u8], sig: &str) -> bool {
        signature::verify_signature(payload, sig, &self.config.webhook_secret)
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
        let hook: EftWebhook = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let status = match hook.state.as_str() {
            "SETTLED" => PaymentStatus::Succeeded,
            "RETURNED" => PaymentStatus::Failed,
            other => {
                return Err(GatewayError::MalformedPayload(format!(
                    "unknown eft state: {}",
                    other
                )))
            }
        };
        let currency: Currency = hook
            .currency
            .parse()
            .map_err(|_| GatewayError::MalformedPayload(format!("currency: {}", hook.currency)))?;

        Ok(WebhookNotice {
            external_id: hook.reference,
            status,
            amount: hook.amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> EftGateway {
        EftGateway::new(
            GatewayConfig {
                kind: GatewayKind::Eft,
                endpoint: "http://localhost:0".to_string(),
                webhook_secret: "whsec_eft".to_string(),
                currencies: vec![Currency::ZAR],
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_parse_settled_webhook() {
        let payload =
            br#"{"reference":"eft_77","state":"SETTLED","amount":51750,"currency":"ZAR"}"#;
        let notice = gateway().parse_webhook(payload).unwrap();

        assert_eq!(notice.external_id, "eft_77");
        assert_eq!(notice.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn test_parse_returned_maps_to_failed() {
        let payload =
            br#"{"reference":"eft_78","state":"RETURNED","amount":51750,"currency":"ZAR"}"#;
        let notice = gateway().parse_webhook(payload).unwrap();

        assert_eq!(notice.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            gateway().parse_webhook(b"not json"),
            Err(GatewayError::MalformedPayload(_))
        ));
    }
}

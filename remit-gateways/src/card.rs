//! Card network adapter.
//!
//! The card provider speaks a charge-oriented API: we POST a charge and
//! it notifies us with `{"id", "status", "amount", "currency"}` webhooks
//! where status is `succeeded` or `failed`.

use remit_types::{
    Currency, GatewayConfig, GatewayError, GatewayKind, PaymentGateway, PaymentHandle,
    PaymentRequest, PaymentStatus, WebhookNotice,
};
use serde::Deserialize;

use crate::signature;

pub struct CardGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CardWebhook {
    id: String,
    status: String,
    amount: i64,
    currency: String,
}

impl CardGateway {
    pub fn new(config: GatewayConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for CardGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Card
    }

    fn supported_currencies(&self) -> &[Currency] {
        &self.config.currencies
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentHandle, GatewayError> {
        let url = format!("{}/v1/charges", self.config.endpoint);
        let body = serde_json::json!({
            "amount": request.amount.amount(),
            "currency": request.amount.currency().to_string(),
            "reference": request.transaction_id.to_string(),
            "source": request.fields,
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
                "card charge rejected ({}): {}",
                status, detail
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "card provider returned {}",
                status
            )));
        }

        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        tracing::info!(external_id = %charge.id, "card charge initiated");

        let metadata = serde_json::json!({ "provider_status": charge.status });
        Ok(PaymentHandle {
            external_id: charge.id,
            status: PaymentStatus::Pending,
            metadata,
        })
    }

    fn verify_signature(&self, payload: &[u8], sig: &str) -> bool {
        signature::verify_signature(payload, sig, &self.config.webhook_secret)
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
        let hook: CardWebhook = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let status = match hook.status.as_str() {
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            other => {
                return Err(GatewayError::MalformedPayload(format!(
                    "unknown card status: {}",
                    other
                )))
            }
        };
        let currency: Currency = hook
            .currency
            .parse()
            .map_err(|_| GatewayError::MalformedPayload(format!("currency: {}", hook.currency)))?;

        Ok(WebhookNotice {
            external_id: hook.id,
            status,
            amount: hook.amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> CardGateway {
        CardGateway::new(
            GatewayConfig {
                kind: GatewayKind::Card,
                endpoint: "http://localhost:0".to_string(),
                webhook_secret: "whsec_card".to_string(),
                currencies: vec![Currency::ZAR, Currency::USD],
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_parse_succeeded_webhook() {
        let payload = br#"{"id":"ch_1","status":"succeeded","amount":51750,"currency":"ZAR"}"#;
        let notice = gateway().parse_webhook(payload).unwrap();

        assert_eq!(notice.external_id, "ch_1");
        assert_eq!(notice.status, PaymentStatus::Succeeded);
        assert_eq!(notice.amount, 51750);
        assert_eq!(notice.currency, Currency::ZAR);
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let payload = br#"{"id":"ch_1","status":"disputed","amount":100,"currency":"ZAR"}"#;
        assert!(matches!(
            gateway().parse_webhook(payload),
            Err(GatewayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_signature_uses_configured_secret() {
        let gw = gateway();
        let payload = b"body";
        let sig = signature::sign_payload(payload, "whsec_card");

        assert!(gw.verify_signature(payload, &sig));
        assert!(!gw.verify_signature(payload, "deadbeef"));
    }

    #[test]
    fn test_supports_configured_currencies() {
        let gw = gateway();
        assert!(gw.supports(Currency::ZAR));
        assert!(!gw.supports(Currency::MWK));
    }
}

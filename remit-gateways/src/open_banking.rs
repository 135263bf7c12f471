//! Open banking adapter.
//!
//! Payments are initiated against a user consent and the provider
//! notifies with `{"payment_id", "status", "amount", "currency"}`
//! webhooks where status is `AUTHORISED` or `REJECTED`.

use remit_types::{
    Currency, GatewayConfig, GatewayError, GatewayKind, PaymentGateway, PaymentHandle,
    PaymentRequest, PaymentStatus, WebhookNotice,
};
use serde::Deserialize;

use crate::signature;

pub struct OpenBankingGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InitiationResponse {
    payment_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct OpenBankingWebhook {
    payment_id: String,
    status: String,
    amount: i64,
    currency: String,
}

impl OpenBankingGateway {
    pub fn new(config: GatewayConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for OpenBankingGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::OpenBanking
    }

    fn supported_currencies(&self) -> &[Currency] {
        &self.config.currencies
    }

    async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentHandle, GatewayError> {
        let url = format!("{}/payment-initiations", self.config.endpoint);
        let body = serde_json::json!({
            "instructed_amount": {
                "amount": request.amount.amount(),
                "currency": request.amount.currency().to_string(),
            },
            "end_to_end_id": request.transaction_id.to_string(),
            "consent": request.fields,
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
                "payment initiation rejected ({}): {}",
                status, detail
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "open banking provider returned {}",
                status
            )));
        }

        let initiation: InitiationResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        tracing::info!(external_id = %initiation.payment_id, "open banking payment initiated");

        let metadata = serde_json::json!({ "provider_status": initiation.status });
        Ok(PaymentHandle {
            external_id: initiation.payment_id,
            status: PaymentStatus::Pending,
            metadata,
        })
    }

    fn verify_signature(&self, payload: &[u8], sig: &str) -> bool {
        signature::verify_signature(payload, sig, &self.config.webhook_secret)
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookNotice, GatewayError> {
        let hook: OpenBankingWebhook = serde_json::from_slice(payload)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let status = match hook.status.as_str() {
            "AUTHORISED" => PaymentStatus::Succeeded,
            "REJECTED" => PaymentStatus::Failed,
            other => {
                return Err(GatewayError::MalformedPayload(format!(
                    "unknown open banking status: {}",
                    other
                )))
            }
        };
        let currency: Currency = hook
            .currency
            .parse()
            .map_err(|_| GatewayError::MalformedPayload(format!("currency: {}", hook.currency)))?;

        Ok(WebhookNotice {
            external_id: hook.payment_id,
            status,
            amount: hook.amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> OpenBankingGateway {
        OpenBankingGateway::new(
            GatewayConfig {
                kind: GatewayKind::OpenBanking,
                endpoint: "http://localhost:0".to_string(),
                webhook_secret: "whsec_ob".to_string(),
                currencies: vec![Currency::USD, Currency::ZAR],
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_parse_authorised_webhook() {
        let payload =
            br#"{"payment_id":"ob_42","status":"AUTHORISED","amount":2802,"currency":"USD"}"#;
        let notice = gateway().parse_webhook(payload).unwrap();

        assert_eq!(notice.external_id, "ob_42");
        assert_eq!(notice.status, PaymentStatus::Succeeded);
        assert_eq!(notice.currency, Currency::USD);
    }

    #[test]
    fn test_parse_rejected_maps_to_failed() {
        let payload =
            br#"{"payment_id":"ob_43","status":"REJECTED","amount":2802,"currency":"USD"}"#;
        let notice = gateway().parse_webhook(payload).unwrap();

        assert_eq!(notice.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_parse_rejects_unsupported_currency() {
        let payload =
            br#"{"payment_id":"ob_44","status":"AUTHORISED","amount":100,"currency":"JPY"}"#;
        assert!(matches!(
            gateway().parse_webhook(payload),
            Err(GatewayError::MalformedPayload(_))
        ));
    }
}

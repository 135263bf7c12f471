//! # Remit Client SDK
//!
//! A typed Rust client for the transfer API.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use remit_types::{
    CreateTransactionRequest, DeviceContext, GatewayKind, PaymentResponse, ProcessPaymentRequest,
    Quote, QuoteId, QuoteRequest, Recipient, TransactionDetailResponse, TransactionId,
    TransactionResponse, VerificationPendingResponse, VerifyTransactionRequest,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of submitting a transfer: created outright, or held until
/// the sender completes step-up verification.
#[derive(Debug)]
pub enum TransferOutcome {
    Created(TransactionResponse),
    VerificationPending(VerificationPendingResponse),
}

/// Transfer API client.
pub struct RemitClient {
    base_url: String,
    user_id: Option<Uuid>,
    http: Client,
}

impl RemitClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: None,
            http: Client::new(),
        }
    }

    /// Sets the caller identity sent in the `X-User-Id` header.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Prices a transfer.
    pub async fn quote(&self, req: &QuoteRequest) -> Result<Quote, ClientError> {
        self.post("/api/quotes", req).await
    }

    /// Commits a quote into a transaction.
    ///
    /// A 202 response means the transfer is held for verification;
    /// complete it with [`RemitClient::verify_transaction`].
    pub async fn create_transaction(
        &self,
        quote_id: QuoteId,
        recipient: Recipient,
        idempotency_key: Option<String>,
        device: DeviceContext,
    ) -> Result<TransferOutcome, ClientError> {
        let req = CreateTransactionRequest {
            quote_id,
            recipient,
            idempotency_key,
            device,
        };
        let resp = self
            .request(reqwest::Method::POST, "/api/transactions")
            .json(&req)
            .send()
            .await?;

        if resp.status() == StatusCode::ACCEPTED {
            let body = resp.text().await?;
            return Ok(TransferOutcome::VerificationPending(serde_json::from_str(
                &body,
            )?));
        }
        let tx: TransactionResponse = self.handle_response(resp).await?;
        Ok(TransferOutcome::Created(tx))
    }

    /// Completes step-up verification of a held transfer.
    pub async fn verify_transaction(
        &self,
        id: TransactionId,
        token: impl Into<String>,
        otp: impl Into<String>,
    ) -> Result<TransactionResponse, ClientError> {
        let req = VerifyTransactionRequest {
            token: token.into(),
            otp: otp.into(),
        };
        self.post(&format!("/api/transactions/{}/verify", id), &req)
            .await
    }

    /// Initiates settlement of a pending transaction through a gateway.
    pub async fn process_payment(
        &self,
        transaction_id: TransactionId,
        gateway: GatewayKind,
        fields: serde_json::Value,
    ) -> Result<PaymentResponse, ClientError> {
        let req = ProcessPaymentRequest { gateway, fields };
        self.post(&format!("/api/payments/{}/process", transaction_id), &req)
            .await
    }

    /// Cancels a pending transaction.
    pub async fn cancel_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionResponse, ClientError> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/api/transactions/{}/cancel", id),
            )
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Gets a transaction with its transition history.
    pub async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<TransactionDetailResponse, ClientError> {
        self.get(&format!("/api/transactions/{}", id)).await
    }

    /// Lists the caller's transactions.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionResponse>, ClientError> {
        self.get("/api/transactions").await
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(user_id) = &self.user_id {
            req = req.header("X-User-Id", user_id.to_string());
        }
        req
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RemitClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = RemitClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_user() {
        let user_id = Uuid::new_v4();
        let client = RemitClient::new("http://localhost:3000").with_user(user_id);
        assert_eq!(client.user_id, Some(user_id));
    }
}

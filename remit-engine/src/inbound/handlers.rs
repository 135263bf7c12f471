//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use remit_types::{
    AppError, CreateTransactionRequest, GatewayKind, PaymentResponse, ProcessPaymentRequest,
    QuoteRequest, TransactionDetailResponse, TransactionId, TransactionResponse,
    TransferRepository, VerificationPendingResponse, VerifyTransactionRequest,
};

use super::identity::UserId;
use crate::reconciler::WebhookReconciler;
use crate::service::{CreateOutcome, TransferService};

/// Application state shared across handlers.
pub struct AppState<R: TransferRepository> {
    pub service: TransferService<R>,
    pub reconciler: WebhookReconciler<R>,
}

/// Header carrying the provider's webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_)
            | AppError::UnsupportedCurrency(_)
            | AppError::UnsupportedGatewayCurrency { .. } => StatusCode::BAD_REQUEST,
            AppError::FraudBlocked => StatusCode::FORBIDDEN,
            AppError::QuoteExpired | AppError::VerificationExpired => StatusCode::GONE,
            AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal detail stays in the logs, never in the response body.
        let message = match &self.0 {
            AppError::Internal(detail) => {
                tracing::error!(detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "code": self.0.code()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Price a transfer.
#[tracing::instrument(skip(state), fields(amount = req.send_amount, from = %req.from_currency, to = %req.to_currency))]
pub async fn create_quote<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state.service.create_quote(&req).await?;
    Ok(Json(quote))
}

/// Commit a quote into a transaction.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0, quote_id = %req.quote_id))]
pub async fn create_transaction<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<Response, ApiError> {
    match state.service.create_transaction(user.0, req).await? {
        CreateOutcome::Created(tx) => Ok((
            StatusCode::CREATED,
            Json(TransactionResponse::from(tx)),
        )
            .into_response()),
        CreateOutcome::VerificationRequired {
            transaction_id,
            token,
            expires_in_secs,
        } => Ok((
            StatusCode::ACCEPTED,
            Json(VerificationPendingResponse {
                verification_required: true,
                transaction_id,
                token,
                expires_in_secs,
            }),
        )
            .into_response()),
    }
}

/// Complete step-up verification of a held transfer.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0, transaction_id = %id))]
pub async fn verify_transaction<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
    Path(id): Path<String>,
    Json(req): Json<VerifyTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_transaction_id(&id)?;
    let tx = state
        .service
        .verify_transaction(user.0, transaction_id, &req.token, &req.otp)
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse::from(tx))))
}

/// Settle a pending transaction through a gateway.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0, transaction_id = %id, gateway = %req.gateway))]
pub async fn process_payment<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
    Path(id): Path<String>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_transaction_id(&id)?;
    let payment = state
        .service
        .process_payment(user.0, transaction_id, req)
        .await?;
    Ok(Json(PaymentResponse::from(payment)))
}

/// Gateway webhook intake.
///
/// Answers 200 for everything reconciliation absorbs so providers stop
/// retrying; only a bad signature earns a 401.
#[tracing::instrument(skip(state, headers, body), fields(gateway = %gateway_id))]
pub async fn webhook<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(gateway_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let kind: GatewayKind = gateway_id
        .parse()
        .map_err(|_| AppError::NotFound(format!("gateway {}", gateway_id)))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    state.reconciler.handle(kind, &body, signature).await?;
    Ok(Json(serde_json::json!({ "received": true })))
}

/// Cancel a pending transaction.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0, transaction_id = %id))]
pub async fn cancel_transaction<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_transaction_id(&id)?;
    let tx = state
        .service
        .cancel_transaction(user.0, transaction_id)
        .await?;
    Ok(Json(TransactionResponse::from(tx)))
}

/// Get a transaction with its transition history.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0, transaction_id = %id))]
pub async fn get_transaction<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_id = parse_transaction_id(&id)?;
    let (tx, history) = state.service.get_transaction(user.0, transaction_id).await?;
    Ok(Json(TransactionDetailResponse {
        transaction: tx.into(),
        history,
    }))
}

/// List the caller's transactions.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn list_transactions<R: TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    user: UserId,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.service.list_transactions(user.0).await?;
    let response: Vec<TransactionResponse> =
        transactions.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// Serve the generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    use utoipa::OpenApi;
    Json(crate::openapi::ApiDoc::openapi())
}

fn parse_transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(AppError::Validation("Invalid transaction ID".into())))
}

//! Caller identity extraction.
//!
//! An upstream auth proxy has already authenticated the caller and
//! injects their id via the `X-User-Id` header. This extractor parses
//! it; requests without a valid id are rejected with 401.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller's id.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[derive(Debug)]
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Missing or invalid X-User-Id header",
                "code": "UNAUTHENTICATED"
            })),
        )
            .into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(UserId)
            .ok_or(IdentityRejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<UserId, IdentityRejection> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        UserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header_extracted() {
        let id = Uuid::new_v4();
        let user = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(user.0, id);
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        assert!(extract(None).await.is_err());
    }

    #[tokio::test]
    async fn test_garbage_header_rejected() {
        assert!(extract(Some("not-a-uuid")).await.is_err());
    }
}

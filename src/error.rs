use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Provider error (status {status})")]
    Provider {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            ApiError::Provider { status, body } => {
                tracing::warn!(status, body = %body, "Provider rejected the request");
                (
                    StatusCode::from_u16(status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    body,
                )
            }
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                let msg = e.to_string();
                let msg = if msg.is_empty() {
                    "Internal server error".to_string()
                } else {
                    msg
                };
                (StatusCode::INTERNAL_SERVER_ERROR, json!(msg))
            }
        };

        (status, Json(json!({ "error": error }))).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_status() {
        let err = ApiError::Provider {
            status: 403,
            body: json!("invalid token"),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_provider_error_bad_status_falls_back_to_500() {
        let err = ApiError::Provider {
            status: 0,
            body: json!("whatever"),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        let err = ApiError::BadRequest("subscriptionId and purchaseToken are required".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

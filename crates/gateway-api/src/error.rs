// API error envelope: `{"error": {"message", "type"}}` with the status
// mapped from `GatewayError`'s kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::GatewayError;
use serde::Serialize;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    r#type: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, r#type) = match &self.0 {
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            GatewayError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "api_error"),
            GatewayError::Forbidden(_) => (StatusCode::FORBIDDEN, "api_error"),
            GatewayError::NotFound(_) | GatewayError::AgentNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            GatewayError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            GatewayError::Upstream { status, .. } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                (code, "api_error")
            }
            GatewayError::Repository(_) | GatewayError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error")
            }
        };

        let body = ErrorEnvelope {
            error: ErrorBody {
                message: self.0.to_string(),
                r#type,
            },
        };

        (status, Json(body)).into_response()
    }
}

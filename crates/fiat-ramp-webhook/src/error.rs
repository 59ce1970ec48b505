use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use fiat_ramp::{AuthFailure, RampError};

/// HTTP face of a [`RampError`].
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub RampError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            RampError::Authentication(_) => StatusCode::UNAUTHORIZED,
            RampError::Validation(_) => StatusCode::BAD_REQUEST,
            // Identity problems are absorbed by the pipeline and never reach
            // here; if they do, treat them like any other internal failure.
            RampError::Storage(_)
            | RampError::Integrity(_)
            | RampError::UnresolvedIdentity(_)
            | RampError::UnsupportedStatus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            RampError::Authentication(AuthFailure::MissingSignature) => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "authentication required"
                }))
            }
            RampError::Authentication(AuthFailure::InvalidSignature) => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "authentication failed"
                }))
            }
            RampError::Validation(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_payload",
                "message": msg
            })),
            other => {
                tracing::error!(error = %other, "webhook processing failed");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}

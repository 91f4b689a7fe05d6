/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`. Core errors convert with `?` and map to
/// one status code per kind:
///
/// | Kind           | Status |
/// |----------------|--------|
/// | `Unauthorized` | 401    |
/// | `Forbidden`    | 403    |
/// | `InvalidRole`  | 403    |
/// | `NotFound`     | 404    |
/// | `BadRequest`   | 400    |
/// | `Conflict`     | 409    |
/// | `Internal`     | 500    |
///
/// Request bodies failing `validator` rules are 422 with per-field details.
/// Internal errors are logged and replaced by a generic message.
///
/// # Example
///
/// ```
/// use tenantry_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("Company not found".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tenantry_shared::error::CoreError;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), a uniqueness race lost at the store
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            CoreError::Forbidden(msg) => ApiError::Forbidden(msg),
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::BadRequest(msg) => ApiError::BadRequest(msg),
            err @ CoreError::InvalidRole(_) => ApiError::Forbidden(err.to_string()),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invite has expired".to_string());
        assert_eq!(err.to_string(), "Bad request: Invite has expired");

        let err = ApiError::NotFound("Company not found".to_string());
        assert_eq!(err.to_string(), "Not found: Company not found");
    }

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (CoreError::forbidden("x"), StatusCode::FORBIDDEN),
            (CoreError::InvalidRole("ROOT".to_string()), StatusCode::FORBIDDEN),
            (CoreError::not_found("x"), StatusCode::NOT_FOUND),
            (CoreError::bad_request("x"), StatusCode::BAD_REQUEST),
            (CoreError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (CoreError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (core, status) in cases {
            let response = ApiError::from(core).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_invalid_role_keeps_message() {
        let err = ApiError::from(CoreError::InvalidRole("ROOT".to_string()));
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "Invalid role: ROOT"));
    }
}

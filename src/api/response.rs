//! Unified API response envelope and store-error mapping.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::store::StoreError;

/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;
    pub const CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            error_codes::INVALID_PARAMETER,
            msg,
        )),
    )
}

pub fn unauthorized(code: i32, msg: impl Into<String>) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(ApiResponse::<()>::error(code, msg)))
}

pub fn forbidden(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(ApiResponse::<()>::error(error_codes::FORBIDDEN, msg)),
    )
}

pub fn not_found(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(error_codes::NOT_FOUND, msg)),
    )
}

/// Map a store error onto the HTTP taxonomy: not-found -> 404,
/// uniqueness conflict -> 409, foreign key -> 400, anything else -> 500
/// (retryable errors reach here only after the retry budget is spent).
pub fn store_error(err: StoreError) -> ApiError {
    if err.is_not_found() {
        return not_found(err.to_string());
    }
    if err.is_unique_violation() {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::<()>::error(error_codes::CONFLICT, err.to_string())),
        );
    }
    if err.is_foreign_key_violation() {
        return bad_request(err.to_string());
    }

    tracing::error!(error = %err, "internal store error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            "internal error",
        )),
    )
}

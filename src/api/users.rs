//! User handlers: registration, login, token renewal, email verification.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use super::response::{
    ApiError, ApiResponse, bad_request, error_codes, not_found, store_error, unauthorized,
};
use crate::store::models::User;
use crate::store::tx_create_user::CreateUserTxParams;
use crate::store::tx_verify_email::VerifyEmailTxParams;
use crate::store::users::{self, CreateSessionParams, CreateUserParams, UpdateUserParams};
use crate::store::StoreError;
use crate::token::Claims;
use crate::util::password::{hash_password, verify_password};
use crate::worker::PayloadSendVerifyEmail;

/// User fields safe to return to clients.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_email_verified: bool,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            is_email_verified: user.is_email_verified,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 32), custom(function = validate_username))]
    pub username: String,
    #[validate(length(min = 6, max = 72))]
    pub password: String,
    #[validate(length(min = 1, max = 64))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
}

fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new(
            "must contain only lowercase letters, digits and underscores",
        ))
    }
}

/// POST /api/v1/users
///
/// Creates the user and schedules the verification email in one
/// transaction: if the task queue refuses the payload, the user row is
/// rolled back too.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    req.validate().map_err(|e| bad_request(e.to_string()))?;

    let hashed_password = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        bad_request("invalid password")
    })?;

    let distributor = state.distributor.clone();
    let result = state
        .store
        .create_user_tx(CreateUserTxParams {
            create_user: CreateUserParams {
                username: req.username,
                hashed_password,
                full_name: req.full_name,
                email: req.email,
            },
            after_create: Box::new(move |user| {
                Box::pin(async move {
                    distributor
                        .distribute_send_verify_email(PayloadSendVerifyEmail {
                            username: user.username,
                        })
                        .await
                        .map_err(|e| StoreError::Hook(e.to_string()))
                })
            }),
        })
        .await
        .map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(result.user.into())),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 72))]
    pub password: Option<String>,
}

/// PATCH /api/v1/users/me
///
/// Partial update of the authenticated user. Omitted fields keep their
/// current value; a new password also moves `password_changed_at`.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    req.validate().map_err(|e| bad_request(e.to_string()))?;

    let (hashed_password, password_changed_at) = match &req.password {
        Some(password) => {
            let hashed = hash_password(password).map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                bad_request("invalid password")
            })?;
            (Some(hashed), Some(Utc::now()))
        }
        None => (None, None),
    };

    let user = users::update_user(
        state.store.pool(),
        &UpdateUserParams {
            username: claims.sub,
            hashed_password,
            password_changed_at,
            full_name: req.full_name,
            email: req.email,
            is_email_verified: None,
        },
    )
    .await
    .map_err(store_error)?;

    Ok(Json(ApiResponse::success(user.into())))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 6, max = 72))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUserResponse {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// POST /api/v1/users/login
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginUserRequest>,
) -> Result<Json<ApiResponse<LoginUserResponse>>, ApiError> {
    req.validate().map_err(|e| bad_request(e.to_string()))?;

    let user = users::get_user(state.store.pool(), &req.username)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("user not found"))?;

    verify_password(&req.password, &user.hashed_password)
        .map_err(|_| unauthorized(error_codes::AUTH_FAILED, "incorrect password"))?;

    let access_ttl = Duration::minutes(state.config.token.access_token_minutes);
    let refresh_ttl = Duration::hours(state.config.token.refresh_token_hours);

    let (access_token, access_claims) = state
        .token_maker
        .create_token(&user.username, access_ttl)
        .map_err(|e| internal(e))?;
    let (refresh_token, refresh_claims) = state
        .token_maker
        .create_token(&user.username, refresh_ttl)
        .map_err(|e| internal(e))?;

    let session = users::create_session(
        state.store.pool(),
        &CreateSessionParams {
            id: refresh_claims.jti,
            username: user.username.clone(),
            refresh_token: refresh_token.clone(),
            user_agent: header_str(&headers, header::USER_AGENT),
            client_ip: header_str(&headers, header::FORWARDED),
            expires_at: timestamp(refresh_claims.exp),
        },
    )
    .await
    .map_err(store_error)?;

    Ok(Json(ApiResponse::success(LoginUserResponse {
        session_id: session.id,
        access_token,
        access_token_expires_at: timestamp(access_claims.exp),
        refresh_token,
        refresh_token_expires_at: timestamp(refresh_claims.exp),
        user: user.into(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

/// POST /api/v1/tokens/renew_access
pub async fn renew_access_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenewAccessTokenRequest>,
) -> Result<Json<ApiResponse<RenewAccessTokenResponse>>, ApiError> {
    let claims = state
        .token_maker
        .verify_token(&req.refresh_token)
        .map_err(|e| unauthorized(error_codes::AUTH_FAILED, e.to_string()))?;

    let session = users::get_session(state.store.pool(), claims.jti)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("session not found"))?;

    if session.is_blocked {
        return Err(unauthorized(error_codes::AUTH_FAILED, "session is blocked"));
    }
    if session.username != claims.sub {
        return Err(unauthorized(error_codes::AUTH_FAILED, "session user mismatch"));
    }
    if session.refresh_token != req.refresh_token {
        return Err(unauthorized(error_codes::AUTH_FAILED, "session token mismatch"));
    }
    if session.expires_at < Utc::now() {
        return Err(unauthorized(error_codes::AUTH_FAILED, "session is expired"));
    }

    let access_ttl = Duration::minutes(state.config.token.access_token_minutes);
    let (access_token, access_claims) = state
        .token_maker
        .create_token(&session.username, access_ttl)
        .map_err(|e| internal(e))?;

    Ok(Json(ApiResponse::success(RenewAccessTokenResponse {
        access_token,
        access_token_expires_at: timestamp(access_claims.exp),
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub email_id: i64,
    pub secret_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub is_email_verified: bool,
}

/// GET /api/v1/verify_email?email_id=..&secret_code=..
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<ApiResponse<VerifyEmailResponse>>, ApiError> {
    let result = state
        .store
        .verify_email_tx(VerifyEmailTxParams {
            email_id: query.email_id,
            secret_code: query.secret_code,
        })
        .await
        .map_err(store_error)?;

    Ok(Json(ApiResponse::success(VerifyEmailResponse {
        is_email_verified: result.user.is_email_verified,
    })))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "token creation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            "internal error",
        )),
    )
}

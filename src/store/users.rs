//! User, session and email-verification queries.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::error::StoreError;
use super::models::{Session, User, VerifyEmail};

const USER_COLUMNS: &str = "username, hashed_password, full_name, email, \
     is_email_verified, password_changed_at, created_at";

const VERIFY_EMAIL_COLUMNS: &str =
    "id, username, email, secret_code, is_used, created_at, expired_at";

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

pub async fn create_user<'e>(
    ex: impl PgExecutor<'e>,
    arg: &CreateUserParams,
) -> Result<User, StoreError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"INSERT INTO users (username, hashed_password, full_name, email)
           VALUES ($1, $2, $3, $4)
           RETURNING {USER_COLUMNS}"#
    ))
    .bind(&arg.username)
    .bind(&arg.hashed_password)
    .bind(&arg.full_name)
    .bind(&arg.email)
    .fetch_one(ex)
    .await?;

    Ok(user)
}

pub async fn get_user<'e>(
    ex: impl PgExecutor<'e>,
    username: &str,
) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(ex)
    .await?;

    Ok(user)
}

/// Partial user update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub username: String,
    pub hashed_password: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_email_verified: Option<bool>,
}

pub async fn update_user<'e>(
    ex: impl PgExecutor<'e>,
    arg: &UpdateUserParams,
) -> Result<User, StoreError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"UPDATE users SET
               hashed_password = COALESCE($1, hashed_password),
               password_changed_at = COALESCE($2, password_changed_at),
               full_name = COALESCE($3, full_name),
               email = COALESCE($4, email),
               is_email_verified = COALESCE($5, is_email_verified)
           WHERE username = $6
           RETURNING {USER_COLUMNS}"#
    ))
    .bind(&arg.hashed_password)
    .bind(arg.password_changed_at)
    .bind(&arg.full_name)
    .bind(&arg.email)
    .bind(arg.is_email_verified)
    .bind(&arg.username)
    .fetch_optional(ex)
    .await?;

    user.ok_or(StoreError::RecordNotFound)
}

#[derive(Debug, Clone)]
pub struct CreateVerifyEmailParams {
    pub username: String,
    pub email: String,
    pub secret_code: String,
}

pub async fn create_verify_email<'e>(
    ex: impl PgExecutor<'e>,
    arg: &CreateVerifyEmailParams,
) -> Result<VerifyEmail, StoreError> {
    let verify_email = sqlx::query_as::<_, VerifyEmail>(&format!(
        r#"INSERT INTO verify_emails (username, email, secret_code)
           VALUES ($1, $2, $3)
           RETURNING {VERIFY_EMAIL_COLUMNS}"#
    ))
    .bind(&arg.username)
    .bind(&arg.email)
    .bind(&arg.secret_code)
    .fetch_one(ex)
    .await?;

    Ok(verify_email)
}

/// Mark a verification record used, in one guarded statement.
///
/// Matches only an unused, unexpired row with the right secret code, so a
/// replayed or expired attempt updates nothing and `None` comes back.
pub async fn use_verify_email<'e>(
    ex: impl PgExecutor<'e>,
    id: i64,
    secret_code: &str,
) -> Result<Option<VerifyEmail>, StoreError> {
    let verify_email = sqlx::query_as::<_, VerifyEmail>(&format!(
        r#"UPDATE verify_emails SET is_used = TRUE
           WHERE id = $1
             AND secret_code = $2
             AND is_used = FALSE
             AND expired_at > now()
           RETURNING {VERIFY_EMAIL_COLUMNS}"#
    ))
    .bind(id)
    .bind(secret_code)
    .fetch_optional(ex)
    .await?;

    Ok(verify_email)
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub id: Uuid,
    pub username: String,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_session<'e>(
    ex: impl PgExecutor<'e>,
    arg: &CreateSessionParams,
) -> Result<Session, StoreError> {
    let session = sqlx::query_as::<_, Session>(
        r#"INSERT INTO sessions (id, username, refresh_token, user_agent, client_ip, expires_at)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id, username, refresh_token, user_agent, client_ip,
                     is_blocked, expires_at, created_at"#,
    )
    .bind(arg.id)
    .bind(&arg.username)
    .bind(&arg.refresh_token)
    .bind(&arg.user_agent)
    .bind(&arg.client_ip)
    .bind(arg.expires_at)
    .fetch_one(ex)
    .await?;

    Ok(session)
}

pub async fn get_session<'e>(
    ex: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<Session>, StoreError> {
    let session = sqlx::query_as::<_, Session>(
        r#"SELECT id, username, refresh_token, user_agent, client_ip,
                  is_blocked, expires_at, created_at
           FROM sessions WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;

    Ok(session)
}

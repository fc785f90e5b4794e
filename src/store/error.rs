//! Store error taxonomy and Postgres error classification.

use thiserror::Error;

// SQLSTATE codes that are safe to retry with the same parameters.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("record not found")]
    RecordNotFound,

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("retryable database failure ({code})")]
    Retryable { code: String },

    #[error("transaction failed: {source}; rollback also failed: {rollback}")]
    TxRollback {
        source: Box<StoreError>,
        rollback: sqlx::Error,
    },

    #[error("post-create hook failed: {0}")]
    Hook(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => return StoreError::RecordNotFound,
            // Pool exhaustion surfaces as a retryable failure, not a hang.
            sqlx::Error::PoolTimedOut => {
                return StoreError::Retryable {
                    code: "pool_timeout".to_string(),
                };
            }
            sqlx::Error::Database(db) => {
                if let Some(code) = db.code() {
                    let constraint = db.constraint().unwrap_or("unknown").to_string();
                    match code.as_ref() {
                        UNIQUE_VIOLATION => return StoreError::UniqueViolation { constraint },
                        FOREIGN_KEY_VIOLATION => {
                            return StoreError::ForeignKeyViolation { constraint };
                        }
                        SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE => {
                            return StoreError::Retryable {
                                code: code.to_string(),
                            };
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::AccountNotFound(_) | StoreError::RecordNotFound
        )
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKeyViolation { .. })
    }

    /// Whether re-running the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable { .. })
    }
}

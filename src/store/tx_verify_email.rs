//! Verify-email workflow: marking the verification record used and
//! flipping the user's verified flag commit together or not at all.

use super::Store;
use super::error::StoreError;
use super::models::{User, VerifyEmail};
use super::users::{self, UpdateUserParams};

#[derive(Debug, Clone)]
pub struct VerifyEmailTxParams {
    pub email_id: i64,
    pub secret_code: String,
}

#[derive(Debug, Clone)]
pub struct VerifyEmailTxResult {
    pub user: User,
    pub verify_email: VerifyEmail,
}

impl Store {
    /// Consume a verification record and mark the user verified.
    ///
    /// An attempt against a record that is already used, expired, or has
    /// a mismatched secret code fails with not-found and mutates nothing.
    pub async fn verify_email_tx(
        &self,
        arg: VerifyEmailTxParams,
    ) -> Result<VerifyEmailTxResult, StoreError> {
        self.exec_tx(move |conn: &mut sqlx::PgConnection| {
            Box::pin(async move {
                let verify_email =
                    users::use_verify_email(&mut *conn, arg.email_id, &arg.secret_code)
                        .await?
                        .ok_or(StoreError::RecordNotFound)?;

                let user = users::update_user(
                    &mut *conn,
                    &UpdateUserParams {
                        username: verify_email.username.clone(),
                        is_email_verified: Some(true),
                        ..Default::default()
                    },
                )
                .await?;

                Ok(VerifyEmailTxResult { user, verify_email })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{create_random_verify_email, test_pool};

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the ferrobank schema
    async fn verify_email_flips_both_flags() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let (user, verify_email) = create_random_verify_email(&pool).await;
        assert!(!user.is_email_verified);

        let result = store
            .verify_email_tx(VerifyEmailTxParams {
                email_id: verify_email.id,
                secret_code: verify_email.secret_code.clone(),
            })
            .await
            .unwrap();

        assert!(result.verify_email.is_used);
        assert!(result.user.is_email_verified);
        assert_eq!(result.user.username, user.username);
    }

    #[tokio::test]
    #[ignore]
    async fn second_attempt_fails_and_flag_stays_set() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let (_, verify_email) = create_random_verify_email(&pool).await;

        let arg = VerifyEmailTxParams {
            email_id: verify_email.id,
            secret_code: verify_email.secret_code.clone(),
        };
        let first = store.verify_email_tx(arg.clone()).await.unwrap();
        assert!(first.user.is_email_verified);

        let err = store.verify_email_tx(arg).await.unwrap_err();
        assert!(err.is_not_found());

        let user = users::get_user(&pool, &first.user.username)
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_email_verified);
    }

    #[tokio::test]
    #[ignore]
    async fn wrong_secret_code_mutates_nothing() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let (user, verify_email) = create_random_verify_email(&pool).await;

        let err = store
            .verify_email_tx(VerifyEmailTxParams {
                email_id: verify_email.id,
                secret_code: "not-the-code".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let after = users::get_user(&pool, &user.username).await.unwrap().unwrap();
        assert!(!after.is_email_verified);
    }
}

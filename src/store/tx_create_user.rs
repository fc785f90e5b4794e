//! Create-user workflow: the user insert and the caller's follow-up
//! intent (e.g. scheduling a verification mail) commit as one unit.

use futures::future::BoxFuture;

use super::Store;
use super::error::StoreError;
use super::models::User;
use super::users::{self, CreateUserParams};

/// Hook invoked inside the transaction, after the user row is inserted.
/// A hook error rolls the insert back, so "user exists" always implies
/// "the follow-up was scheduled".
pub type AfterCreate = Box<dyn FnOnce(User) -> BoxFuture<'static, Result<(), StoreError>> + Send>;

pub struct CreateUserTxParams {
    pub create_user: CreateUserParams,
    pub after_create: AfterCreate,
}

#[derive(Debug, Clone)]
pub struct CreateUserTxResult {
    pub user: User,
}

impl Store {
    pub async fn create_user_tx(
        &self,
        arg: CreateUserTxParams,
    ) -> Result<CreateUserTxResult, StoreError> {
        let CreateUserTxParams {
            create_user,
            after_create,
        } = arg;

        self.exec_tx(move |conn: &mut sqlx::PgConnection| {
            Box::pin(async move {
                let user = users::create_user(&mut *conn, &create_user).await?;
                after_create(user.clone()).await?;
                Ok(CreateUserTxResult { user })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{random_user_params, test_pool};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the ferrobank schema
    async fn create_user_runs_hook() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let params = random_user_params();
        let hook_ran = Arc::new(AtomicBool::new(false));

        let flag = hook_ran.clone();
        let expected_username = params.username.clone();
        let result = store
            .create_user_tx(CreateUserTxParams {
                create_user: params,
                after_create: Box::new(move |user| {
                    Box::pin(async move {
                        assert_eq!(user.username, expected_username);
                        flag.store(true, Ordering::SeqCst);
                        Ok(())
                    })
                }),
            })
            .await
            .unwrap();

        assert!(hook_ran.load(Ordering::SeqCst));
        assert!(!result.user.is_email_verified);
    }

    #[tokio::test]
    #[ignore]
    async fn hook_failure_rolls_back_user_insert() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let params = random_user_params();
        let username = params.username.clone();

        let err = store
            .create_user_tx(CreateUserTxParams {
                create_user: params,
                after_create: Box::new(|_| {
                    Box::pin(async { Err(StoreError::Hook("queue unavailable".to_string())) })
                }),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Hook(_)));

        let fetched = users::get_user(&pool, &username).await.unwrap();
        assert!(fetched.is_none());
    }
}

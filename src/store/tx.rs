//! Transaction executor: runs a unit of work inside one database
//! transaction with commit/rollback semantics.

use futures::future::BoxFuture;
use sqlx::PgConnection;

use super::Store;
use super::error::StoreError;

/// Bounded retry budget for units of work that fail with a retryable
/// error (serialization failure, deadlock, pool timeout).
pub const TX_MAX_ATTEMPTS: u32 = 3;

impl Store {
    /// Run `work` inside one database transaction.
    ///
    /// The closure receives a connection bound to that transaction; every
    /// statement issued through it commits or rolls back as one unit. On a
    /// work error the transaction is rolled back and the original error
    /// propagated; if the rollback itself fails too, both causes are
    /// reported. A commit failure is returned as the transaction's error.
    ///
    /// If the future is cancelled mid-work, the `sqlx::Transaction` guard
    /// is dropped without commit, which queues a rollback on the
    /// connection. No transaction is ever left open.
    pub async fn exec_tx<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, StoreError>>,
    {
        let mut tx = self.pool().begin().await?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(source) => match tx.rollback().await {
                Ok(()) => Err(source),
                Err(rollback) => Err(StoreError::TxRollback {
                    source: Box::new(source),
                    rollback,
                }),
            },
        }
    }
}

/// Re-run a whole unit of work while it keeps failing with a retryable
/// error, up to [`TX_MAX_ATTEMPTS`]. The work is always restarted from
/// scratch, never resumed mid-transaction.
pub async fn retry_tx<T, F, Fut>(mut run: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match run().await {
            Err(err) if err.is_retryable() && attempt < TX_MAX_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "retrying transaction");
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retry_stops_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_tx(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Retryable {
                code: "40001".to_string(),
            })
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), TX_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn retry_passes_through_terminal_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_tx(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::AccountNotFound(1))
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_tx(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(StoreError::Retryable {
                    code: "40P01".to_string(),
                })
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the ferrobank schema
    async fn exec_tx_rolls_back_on_error() {
        use crate::store::accounts;
        use crate::store::testutil::{create_random_account, create_random_user, test_pool};

        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let user = create_random_user(&pool).await;
        let account = create_random_account(&pool, &user.username).await;
        let id = account.id;

        let result: Result<(), _> = store
            .exec_tx(move |conn: &mut sqlx::PgConnection| {
                Box::pin(async move {
                    accounts::update_account_balance(&mut *conn, id, 999_999).await?;
                    Err(StoreError::RecordNotFound)
                })
            })
            .await;
        assert!(result.is_err());

        let after = accounts::get_account(&pool, id).await.unwrap().unwrap();
        assert_eq!(after.balance, account.balance);
    }
}

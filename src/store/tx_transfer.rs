//! The transfer engine: one multi-statement transaction that moves money
//! between two accounts while preserving double-entry invariants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::models::{Account, Entry, Transfer};
use super::tx::retry_tx;
use super::{Store, accounts, entries, transfers};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Positive amount in minor units.
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

impl Store {
    /// Execute a transfer as one atomic unit of work, retrying the whole
    /// transaction a bounded number of times on serialization failures.
    ///
    /// Inside the transaction:
    /// 1. lock both account rows with a single multi-row `FOR UPDATE`
    ///    select, so lock order is identical regardless of direction;
    /// 2. fail with not-found if either row is missing;
    /// 3. insert the transfer record;
    /// 4. insert the debit entry (source, -amount);
    /// 5. insert the credit entry (destination, +amount);
    /// 6. write both balances computed from the locked reads. The row
    ///    locks exclude concurrent writers, so the balances from step 1
    ///    are still current; nothing is re-read.
    ///
    /// Any step failing rolls the whole transaction back; the result is
    /// returned only after commit.
    pub async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        retry_tx(|| self.transfer_tx_once(arg)).await
    }

    async fn transfer_tx_once(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        self.exec_tx(move |conn: &mut sqlx::PgConnection| {
            Box::pin(async move {
                let locked =
                    accounts::lock_accounts(&mut *conn, &[arg.from_account_id, arg.to_account_id])
                        .await?;

                let mut by_id: HashMap<i64, Account> =
                    locked.into_iter().map(|a| (a.id, a)).collect();
                let from_account = by_id
                    .remove(&arg.from_account_id)
                    .ok_or(StoreError::AccountNotFound(arg.from_account_id))?;
                let to_account = by_id
                    .remove(&arg.to_account_id)
                    .ok_or(StoreError::AccountNotFound(arg.to_account_id))?;

                let transfer = transfers::create_transfer(
                    &mut *conn,
                    transfers::CreateTransferParams {
                        from_account_id: arg.from_account_id,
                        to_account_id: arg.to_account_id,
                        amount: arg.amount,
                    },
                )
                .await?;

                let from_entry = entries::create_entry(
                    &mut *conn,
                    entries::CreateEntryParams {
                        account_id: arg.from_account_id,
                        amount: -arg.amount,
                    },
                )
                .await?;

                let to_entry = entries::create_entry(
                    &mut *conn,
                    entries::CreateEntryParams {
                        account_id: arg.to_account_id,
                        amount: arg.amount,
                    },
                )
                .await?;

                let from_account = accounts::update_account_balance(
                    &mut *conn,
                    from_account.id,
                    from_account.balance - arg.amount,
                )
                .await?;

                let to_account = accounts::update_account_balance(
                    &mut *conn,
                    to_account.id,
                    to_account.balance + arg.amount,
                )
                .await?;

                Ok(TransferTxResult {
                    transfer,
                    from_account,
                    to_account,
                    from_entry,
                    to_entry,
                })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{create_random_account, create_random_user, test_pool};

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the ferrobank schema
    async fn transfer_moves_money_and_writes_entries() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let alice = create_random_user(&pool).await;
        let bob = create_random_user(&pool).await;
        let from = create_random_account(&pool, &alice.username).await;
        let to = create_random_account(&pool, &bob.username).await;

        let amount = 10;
        let result = store
            .transfer_tx(TransferTxParams {
                from_account_id: from.id,
                to_account_id: to.id,
                amount,
            })
            .await
            .unwrap();

        assert_eq!(result.transfer.from_account_id, from.id);
        assert_eq!(result.transfer.to_account_id, to.id);
        assert_eq!(result.transfer.amount, amount);

        // Entry symmetry: two entries summing to zero.
        assert_eq!(result.from_entry.amount, -amount);
        assert_eq!(result.to_entry.amount, amount);
        assert_eq!(result.from_entry.amount + result.to_entry.amount, 0);

        // Balance conservation.
        assert_eq!(result.from_account.balance, from.balance - amount);
        assert_eq!(result.to_account.balance, to.balance + amount);
        assert_eq!(
            result.from_account.balance + result.to_account.balance,
            from.balance + to.balance
        );
    }

    #[tokio::test]
    #[ignore]
    async fn transfer_to_missing_account_changes_nothing() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let alice = create_random_user(&pool).await;
        let from = create_random_account(&pool, &alice.username).await;

        let err = store
            .transfer_tx(TransferTxParams {
                from_account_id: from.id,
                to_account_id: i64::MAX,
                amount: 10,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // Atomicity: the source account is untouched and no entries exist.
        let after = accounts::get_account(&pool, from.id).await.unwrap().unwrap();
        assert_eq!(after.balance, from.balance);
        let account_entries = entries::list_entries(&pool, from.id, 10, 0).await.unwrap();
        assert!(account_entries.is_empty());
        let account_transfers = transfers::list_transfers(&pool, from.id, 10, 0)
            .await
            .unwrap();
        assert!(account_transfers.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn concurrent_transfers_conserve_total_balance() {
        let pool = test_pool().await;
        let store = Store::new(pool.clone());
        let alice = create_random_user(&pool).await;
        let bob = create_random_user(&pool).await;
        let from = create_random_account(&pool, &alice.username).await;
        let to = create_random_account(&pool, &bob.username).await;

        let n = 5;
        let amount = 10;
        let mut handles = Vec::new();
        for _ in 0..n {
            let store = store.clone();
            let (from_id, to_id) = (from.id, to.id);
            handles.push(tokio::spawn(async move {
                store
                    .transfer_tx(TransferTxParams {
                        from_account_id: from_id,
                        to_account_id: to_id,
                        amount,
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let from_after = accounts::get_account(&pool, from.id).await.unwrap().unwrap();
        let to_after = accounts::get_account(&pool, to.id).await.unwrap().unwrap();
        assert_eq!(from_after.balance, from.balance - n * amount);
        assert_eq!(to_after.balance, to.balance + n * amount);
    }
}

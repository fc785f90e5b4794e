//! Transfer record queries. A transfer row is written exactly once per
//! successful transfer transaction.

use sqlx::PgExecutor;

use super::error::StoreError;
use super::models::Transfer;

#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

pub async fn create_transfer<'e>(
    ex: impl PgExecutor<'e>,
    arg: CreateTransferParams,
) -> Result<Transfer, StoreError> {
    let transfer = sqlx::query_as::<_, Transfer>(
        r#"INSERT INTO transfers (from_account_id, to_account_id, amount)
           VALUES ($1, $2, $3)
           RETURNING id, from_account_id, to_account_id, amount, created_at"#,
    )
    .bind(arg.from_account_id)
    .bind(arg.to_account_id)
    .bind(arg.amount)
    .fetch_one(ex)
    .await?;

    Ok(transfer)
}

pub async fn get_transfer<'e>(
    ex: impl PgExecutor<'e>,
    id: i64,
) -> Result<Option<Transfer>, StoreError> {
    let transfer = sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;

    Ok(transfer)
}

/// List transfers where the account appears on either side.
pub async fn list_transfers<'e>(
    ex: impl PgExecutor<'e>,
    account_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transfer>, StoreError> {
    let transfers = sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers
           WHERE from_account_id = $1 OR to_account_id = $1
           ORDER BY id LIMIT $2 OFFSET $3"#,
    )
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(ex)
    .await?;

    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{create_random_account, create_random_user, test_pool};

    #[tokio::test]
    #[ignore] // Requires PostgreSQL with the ferrobank schema
    async fn create_and_get_transfer() {
        let pool = test_pool().await;
        let user = create_random_user(&pool).await;
        let other = create_random_user(&pool).await;
        let from = create_random_account(&pool, &user.username).await;
        let to = create_random_account(&pool, &other.username).await;

        let transfer = create_transfer(
            &pool,
            CreateTransferParams {
                from_account_id: from.id,
                to_account_id: to.id,
                amount: 50,
            },
        )
        .await
        .unwrap();
        assert_eq!(transfer.amount, 50);

        let fetched = get_transfer(&pool, transfer.id).await.unwrap().unwrap();
        assert_eq!(fetched, transfer);
    }

    #[tokio::test]
    #[ignore]
    async fn list_transfers_matches_either_side() {
        let pool = test_pool().await;
        let user = create_random_user(&pool).await;
        let other = create_random_user(&pool).await;
        let a = create_random_account(&pool, &user.username).await;
        let b = create_random_account(&pool, &other.username).await;

        for (from, to) in [(a.id, b.id), (b.id, a.id)] {
            create_transfer(
                &pool,
                CreateTransferParams {
                    from_account_id: from,
                    to_account_id: to,
                    amount: 5,
                },
            )
            .await
            .unwrap();
        }

        let listed = list_transfers(&pool, a.id, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}

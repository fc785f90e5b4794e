//! Entry queries. Entries are written once and never mutated.

use sqlx::PgExecutor;

use super::error::StoreError;
use super::models::Entry;

#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    pub account_id: i64,
    /// Negative for a debit, positive for a credit.
    pub amount: i64,
}

pub async fn create_entry<'e>(
    ex: impl PgExecutor<'e>,
    arg: CreateEntryParams,
) -> Result<Entry, StoreError> {
    let entry = sqlx::query_as::<_, Entry>(
        r#"INSERT INTO entries (account_id, amount)
           VALUES ($1, $2)
           RETURNING id, account_id, amount, created_at"#,
    )
    .bind(arg.account_id)
    .bind(arg.amount)
    .fetch_one(ex)
    .await?;

    Ok(entry)
}

pub async fn get_entry<'e>(ex: impl PgExecutor<'e>, id: i64) -> Result<Option<Entry>, StoreError> {
    let entry = sqlx::query_as::<_, Entry>(
        "SELECT id, account_id, amount, created_at FROM entries WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;

    Ok(entry)
}

pub async fn list_entries<'e>(
    ex: impl PgExecutor<'e>,
    account_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Entry>, StoreError> {
    let entries = sqlx::query_as::<_, Entry>(
        r#"SELECT id, account_id, amount, created_at FROM entries
           WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3"#,
    )
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(ex)
    .await?;

    Ok(entries)
}

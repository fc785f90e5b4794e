//! Account queries, including the multi-row locking read the transfer
//! engine relies on.

use sqlx::PgExecutor;

use super::error::StoreError;
use super::models::Account;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";

#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

pub async fn create_account<'e>(
    ex: impl PgExecutor<'e>,
    arg: &CreateAccountParams,
) -> Result<Account, StoreError> {
    let account = sqlx::query_as::<_, Account>(
        r#"INSERT INTO accounts (owner, balance, currency)
           VALUES ($1, $2, $3)
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(&arg.owner)
    .bind(arg.balance)
    .bind(&arg.currency)
    .fetch_one(ex)
    .await?;

    Ok(account)
}

pub async fn get_account<'e>(
    ex: impl PgExecutor<'e>,
    id: i64,
) -> Result<Option<Account>, StoreError> {
    let account = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(ex)
    .await?;

    Ok(account)
}

/// Locking read: return the rows for the requested ids, holding an
/// exclusive row lock on each until the enclosing transaction ends.
///
/// A single multi-row `FOR UPDATE` select keeps lock acquisition in one
/// statement, so two concurrent transfers over the same pair of accounts
/// request their locks in the same relative order no matter which side is
/// the source. Ids with no matching row are simply absent from the result;
/// absence is interpreted by the caller.
pub async fn lock_accounts<'e>(
    ex: impl PgExecutor<'e>,
    ids: &[i64],
) -> Result<Vec<Account>, StoreError> {
    let accounts = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ANY($1) FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(ex)
    .await?;

    Ok(accounts)
}

/// Persist a new absolute balance for an account.
pub async fn update_account_balance<'e>(
    ex: impl PgExecutor<'e>,
    id: i64,
    balance: i64,
) -> Result<Account, StoreError> {
    let account = sqlx::query_as::<_, Account>(
        r#"UPDATE accounts SET balance = $2 WHERE id = $1
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(id)
    .bind(balance)
    .fetch_optional(ex)
    .await?;

    account.ok_or(StoreError::AccountNotFound(id))
}

pub async fn list_accounts<'e>(
    ex: impl PgExecutor<'e>,
    owner: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Account>, StoreError> {
    let accounts = sqlx::query_as::<_, Account>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE owner = $1 ORDER BY id LIMIT $2 OFFSET $3"
    ))
    .bind(owner)
    .bind(limit)
    .bind(offset)
    .fetch_all(ex)
    .await?;

    Ok(accounts)
}

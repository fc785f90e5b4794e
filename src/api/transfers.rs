//! Transfer handler: request validation in front of the transfer engine.
//!
//! The engine itself only knows account ids and an amount; everything
//! else (ownership, distinct accounts, currency matching) is checked
//! here before the transaction starts.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::AppState;
use super::response::{ApiError, ApiResponse, bad_request, forbidden, not_found, store_error};
use crate::store::accounts;
use crate::store::models::Account;
use crate::store::tx_transfer::{TransferTxParams, TransferTxResult};
use crate::token::Claims;
use crate::util::currency::is_supported_currency;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransferRequest {
    #[validate(range(min = 1))]
    pub from_account_id: i64,
    #[validate(range(min = 1))]
    pub to_account_id: i64,
    #[validate(range(min = 1))]
    pub amount: i64,
    pub currency: String,
}

/// POST /api/v1/transfers
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransferTxResult>>), ApiError> {
    req.validate().map_err(|e| bad_request(e.to_string()))?;
    if !is_supported_currency(&req.currency) {
        return Err(bad_request(format!("unsupported currency: {}", req.currency)));
    }
    if req.from_account_id == req.to_account_id {
        return Err(bad_request("source and destination accounts are the same"));
    }

    let from_account = valid_account(&state, req.from_account_id, &req.currency).await?;
    if from_account.owner != claims.sub {
        return Err(forbidden("source account does not belong to the authenticated user"));
    }
    valid_account(&state, req.to_account_id, &req.currency).await?;

    let result = state
        .store
        .transfer_tx(TransferTxParams {
            from_account_id: req.from_account_id,
            to_account_id: req.to_account_id,
            amount: req.amount,
        })
        .await
        .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

async fn valid_account(
    state: &AppState,
    account_id: i64,
    currency: &str,
) -> Result<Account, ApiError> {
    let account = accounts::get_account(state.store.pool(), account_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(format!("account {account_id} not found")))?;

    if account.currency != currency {
        return Err(bad_request(format!(
            "account {} currency mismatch: {} vs {}",
            account_id, account.currency, currency
        )));
    }
    Ok(account)
}

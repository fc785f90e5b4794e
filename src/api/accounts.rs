//! Account handlers.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::AppState;
use super::response::{ApiError, ApiResponse, bad_request, forbidden, not_found, store_error};
use crate::store::accounts::{self, CreateAccountParams};
use crate::store::models::Account;
use crate::token::Claims;
use crate::util::currency::is_supported_currency;

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub currency: String,
}

/// POST /api/v1/accounts
///
/// Opens an account for the authenticated user with a zero balance.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Account>>), ApiError> {
    if !is_supported_currency(&req.currency) {
        return Err(bad_request(format!("unsupported currency: {}", req.currency)));
    }

    let account = accounts::create_account(
        state.store.pool(),
        &CreateAccountParams {
            owner: claims.sub.clone(),
            balance: 0,
            currency: req.currency,
        },
    )
    .await
    .map_err(store_error)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(account))))
}

/// GET /api/v1/accounts/{id}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let account = accounts::get_account(state.store.pool(), id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(format!("account {id} not found")))?;

    if account.owner != claims.sub {
        return Err(forbidden("account does not belong to the authenticated user"));
    }

    Ok(Json(ApiResponse::success(account)))
}

// Bounded so the OFFSET arithmetic below cannot overflow i64.
#[derive(Debug, Deserialize, Validate)]
pub struct ListAccountsQuery {
    #[validate(range(min = 1, max = 1_000_000))]
    pub page_id: i64,
    #[validate(range(min = 1, max = 50))]
    pub page_size: i64,
}

/// GET /api/v1/accounts?page_id=1&page_size=10
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<ApiResponse<Vec<Account>>>, ApiError> {
    query.validate().map_err(|e| bad_request(e.to_string()))?;

    let accounts = accounts::list_accounts(
        state.store.pool(),
        &claims.sub,
        query.page_size,
        (query.page_id - 1) * query.page_size,
    )
    .await
    .map_err(store_error)?;

    Ok(Json(ApiResponse::success(accounts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_accounts_query_bounds_pagination() {
        let valid = ListAccountsQuery {
            page_id: 1_000_000,
            page_size: 50,
        };
        assert!(valid.validate().is_ok());
        // Largest accepted values stay far from i64 overflow.
        assert!((valid.page_id - 1).checked_mul(valid.page_size).is_some());

        let zero_page = ListAccountsQuery {
            page_id: 0,
            page_size: 10,
        };
        assert!(zero_page.validate().is_err());

        let huge_page = ListAccountsQuery {
            page_id: i64::MAX,
            page_size: 10,
        };
        assert!(huge_page.validate().is_err());

        let oversized = ListAccountsQuery {
            page_id: 1,
            page_size: 51,
        };
        assert!(oversized.validate().is_err());
    }
}

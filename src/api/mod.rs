//! REST gateway: routing, shared state, auth middleware.

pub mod accounts;
pub mod middleware;
pub mod response;
pub mod transfers;
pub mod users;

pub use response::{ApiResponse, error_codes};

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;
use crate::token::TokenMaker;
use crate::worker::TaskDistributor;

pub struct AppState {
    pub store: Store,
    pub token_maker: TokenMaker,
    pub distributor: Arc<dyn TaskDistributor>,
    pub config: AppConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/v1/users", post(users::create_user))
        .route("/api/v1/users/login", post(users::login_user))
        .route("/api/v1/tokens/renew_access", post(users::renew_access_token))
        .route("/api/v1/verify_email", get(users::verify_email));

    let protected = Router::new()
        .route("/api/v1/users/me", patch(users::update_user))
        .route(
            "/api/v1/accounts",
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route("/api/v1/accounts/{id}", get(accounts::get_account))
        .route("/api/v1/transfers", post(transfers::create_transfer))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    public.merge(protected).with_state(state)
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<&'static str>>, response::ApiError> {
    sqlx::query("SELECT 1")
        .execute(state.store.pool())
        .await
        .map_err(|e| response::store_error(e.into()))?;
    Ok(Json(ApiResponse::success("ok")))
}

//! Bearer-token authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::AppState;
use super::response::{ApiError, error_codes, unauthorized};

const BEARER_PREFIX: &str = "Bearer ";

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            unauthorized(error_codes::MISSING_AUTH, "missing authorization header")
        })?;

    let token = auth_header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        unauthorized(error_codes::AUTH_FAILED, "invalid authorization header format")
    })?;

    match state.token_maker.verify_token(token) {
        Ok(claims) => {
            // Handlers read the authenticated username from this extension.
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(err) => Err(unauthorized(error_codes::AUTH_FAILED, err.to_string())),
    }
}

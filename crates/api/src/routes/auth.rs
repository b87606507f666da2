//! Login endpoint.

use std::sync::Arc;

use accounts::CredentialStore;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use ledger::StockLedger;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::response::{Envelope, success};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /login
#[tracing::instrument(skip_all)]
pub async fn login<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<LoginResponse>>, ApiError>
where
    L: StockLedger + 'static,
    C: CredentialStore + 'static,
{
    let Json(req) = body.map_err(|e| {
        tracing::debug!(error = %e, "malformed login body");
        ApiError::BadRequest("Invalid request".to_string())
    })?;

    let result = state.auth.login(&req.email, &req.password).await;
    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!("auth_logins_total", "outcome" => outcome).increment(1);

    let token = result?;
    Ok(success(LoginResponse { token }, "Login successful"))
}

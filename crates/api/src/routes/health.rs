//! Health check endpoint.

use axum::Json;

use crate::response::{Envelope, success_message};

/// GET /health
pub async fn check() -> Json<Envelope<()>> {
    success_message("ok")
}

//! Stock movement endpoints.

use std::sync::Arc;

use accounts::CredentialStore;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Form, FromRequest, Multipart, Query, Request, State};
use axum::http::header;
use common::{ProductId, UserId};
use ledger::{Movement, MovementQuery, MovementView, StockLedger};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::{Envelope, success};

/// Form fields of a movement request. Every field arrives as text; numbers
/// that fail to parse are read as zero and then rejected by validation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateMovementForm {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub move_type: String,
}

fn lenient_int(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

impl CreateMovementForm {
    /// The acting user: the submitted `user_id`, or the caller when none
    /// (or zero) was given.
    fn acting_user(&self, caller: AuthUser) -> UserId {
        let submitted = UserId::new(lenient_int(&self.user_id));
        if submitted.is_unset() {
            caller.user_id
        } else {
            submitted
        }
    }
}

impl CreateMovementForm {
    /// Reads the known text fields of a `multipart/form-data` body. Unknown
    /// fields are skipped.
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let slot = match field.name() {
                Some("product_id") => &mut form.product_id,
                Some("user_id") => &mut form.user_id,
                Some("quantity") => &mut form.quantity,
                Some("move_type") => &mut form.move_type,
                _ => continue,
            };
            *slot = field.text().await?;
        }
        Ok(form)
    }
}

/// Movement form accepted as `multipart/form-data` or urlencoded.
pub struct MovementForm(pub CreateMovementForm);

impl<S: Send + Sync> FromRequest<S> for MovementForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        let form = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(invalid_data)?;
            CreateMovementForm::from_multipart(multipart)
                .await
                .map_err(invalid_data)?
        } else {
            let Form(form) = Form::<CreateMovementForm>::from_request(req, state)
                .await
                .map_err(invalid_data)?;
            form
        };

        Ok(Self(form))
    }
}

fn invalid_data(detail: impl std::fmt::Display) -> ApiError {
    tracing::debug!(error = %detail, "malformed movement form");
    ApiError::BadRequest("Invalid data".to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// POST /transactions/create
#[tracing::instrument(skip(state, form), fields(user_id = %caller.user_id))]
pub async fn create<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    caller: AuthUser,
    MovementForm(form): MovementForm,
) -> Result<Json<Envelope<Movement>>, ApiError>
where
    L: StockLedger + 'static,
    C: CredentialStore + 'static,
{
    let movement = state
        .stock
        .apply_movement(
            ProductId::new(lenient_int(&form.product_id)),
            form.acting_user(caller),
            lenient_int(&form.quantity),
            &form.move_type,
        )
        .await?;

    Ok(success(movement, "Transaction created successfully"))
}

/// GET /transactions
#[tracing::instrument(skip(state, params))]
pub async fn list<L, C>(
    State(state): State<Arc<AppState<L, C>>>,
    _caller: AuthUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<Vec<MovementView>>>, ApiError>
where
    L: StockLedger + 'static,
    C: CredentialStore + 'static,
{
    let Query(params) = params.map_err(|e| {
        tracing::debug!(error = %e, "malformed listing query");
        ApiError::BadRequest("Invalid query".to_string())
    })?;
    let query = MovementQuery::parse(params.start_date.as_deref(), params.end_date.as_deref())?;

    let movements = state.stock.movements(query).await?;
    Ok(success(movements, "Transactions fetched successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(user_id: &str) -> CreateMovementForm {
        CreateMovementForm {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn non_numeric_reads_as_zero() {
        assert_eq!(lenient_int("12"), 12);
        assert_eq!(lenient_int("-3"), -3);
        assert_eq!(lenient_int("abc"), 0);
        assert_eq!(lenient_int(""), 0);
        assert_eq!(lenient_int("1.5"), 0);
    }

    #[test]
    fn acting_user_falls_back_to_caller() {
        let caller = AuthUser {
            user_id: UserId::new(7),
        };
        assert_eq!(form("").acting_user(caller), UserId::new(7));
        assert_eq!(form("0").acting_user(caller), UserId::new(7));
        assert_eq!(form("x").acting_user(caller), UserId::new(7));
        assert_eq!(form("3").acting_user(caller), UserId::new(3));
    }
}

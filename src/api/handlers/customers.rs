//! Customer conversation history.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ConversationResponse, MessageHistoryParams};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /customers/{id}/messages`: a customer and their recent messages.
///
/// # Errors
///
/// Returns [`GatewayError::CustomerNotFound`] for an unknown customer.
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/messages",
    tag = "Customers",
    summary = "Get a customer's conversation",
    params(
        ("id" = uuid::Uuid, Path, description = "Customer ID"),
        MessageHistoryParams,
    ),
    responses(
        (status = 200, description = "Customer and recent messages", body = ConversationResponse),
        (status = 404, description = "Customer not found", body = ErrorResponse),
    )
)]
pub async fn customer_messages(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(params): Query<MessageHistoryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let customer = state
        .store
        .get_customer(id)
        .await?
        .ok_or(GatewayError::CustomerNotFound(id))?;
    let messages = state.store.recent_messages(id, params.clamped()).await?;
    Ok(Json(ConversationResponse { customer, messages }))
}

/// Customer routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new().route("/customers/{id}/messages", get(customer_messages))
}

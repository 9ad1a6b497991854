//! Order handlers: create and get.
//!
//! Orders are normally created by the checkout flow; this endpoint lets
//! operators and tests register the pending order a Razorpay payment will
//! later settle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::CreateOrderRequest;
use crate::app_state::AppState;
use crate::domain::Order;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /orders`: register a pending order.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on a bad amount or currency,
/// [`GatewayError::CustomerNotFound`] for an unknown customer and
/// [`GatewayError::Conflict`] if the ID is taken.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "Orders",
    summary = "Create a pending order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Invalid amount or currency", body = ErrorResponse),
        (status = 404, description = "Customer not found", body = ErrorResponse),
        (status = 409, description = "Order ID already exists", body = ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if req.amount <= 0 {
        return Err(GatewayError::InvalidRequest(
            "amount must be positive".to_string(),
        ));
    }
    let currency = req.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid currency code: {}",
            req.currency
        )));
    }

    let id = match req.id.map(|id| id.trim().to_string()) {
        Some(id) if !id.is_empty() => id,
        Some(_) => {
            return Err(GatewayError::InvalidRequest(
                "order id must not be blank".to_string(),
            ));
        }
        None => format!("ORD-{}", uuid::Uuid::new_v4().simple()),
    };
    let user_id = req
        .user_id
        .unwrap_or_else(|| state.config.default_user_id.clone());

    if let Some(customer_id) = req.customer_id
        && state.store.get_customer(customer_id).await?.is_none()
    {
        return Err(GatewayError::CustomerNotFound(customer_id));
    }

    let mut order = Order::new(id, user_id, req.amount, currency);
    order.customer_id = req.customer_id;
    state.store.insert_order(&order).await?;
    tracing::info!(order_id = %order.id, amount = order.amount, "order created");

    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders/{id}`: fetch one order.
///
/// # Errors
///
/// Returns [`GatewayError::OrderNotFound`] if no order has this ID.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "Orders",
    summary = "Get an order",
    params(("id" = String, Path, description = "Merchant order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 404, description = "Order not found", body = ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let order = state
        .store
        .get_order(&id)
        .await?
        .ok_or(GatewayError::OrderNotFound(id))?;
    Ok(Json(order))
}

/// Order routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order))
}

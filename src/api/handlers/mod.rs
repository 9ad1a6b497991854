//! REST endpoint handlers organized by resource.

pub mod customers;
pub mod orders;
pub mod system;
pub mod webhooks;

use axum::Router;

use crate::app_state::AppState;

/// Composes the operational routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(orders::routes())
        .merge(customers::routes())
}

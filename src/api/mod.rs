//! HTTP layer: webhook endpoints, the operational REST API, DTOs and the
//! OpenAPI document.
//!
//! Webhooks and `/health` are mounted at the root; the operational
//! endpoints live under `/api/v1`.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete router with all endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::webhooks::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::openapi::ApiDoc;

    #[test]
    fn openapi_lists_webhook_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/webhook/razorpay",
            "/api/webhook/whatsapp",
            "/api/meta/webhook",
            "/api/v1/orders",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

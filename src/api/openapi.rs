//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use super::dto::{ConversationResponse, CreateOrderRequest, WebhookAck};
use super::handlers::{customers, orders, system, webhooks};
use crate::domain::{
    Customer, Direction, Message, Order, OrderStatus, PaymentStatus, Platform,
};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated API description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "salespilot-gateway",
        description = "Signature-verified webhook ingestion for Razorpay, WhatsApp and Instagram."
    ),
    paths(
        system::health_handler,
        webhooks::razorpay_webhook,
        webhooks::whatsapp_verify,
        webhooks::whatsapp_webhook,
        webhooks::instagram_verify,
        webhooks::instagram_webhook,
        orders::create_order,
        orders::get_order,
        customers::customer_messages,
    ),
    components(schemas(
        system::HealthResponse,
        WebhookAck,
        CreateOrderRequest,
        ConversationResponse,
        Order,
        OrderStatus,
        PaymentStatus,
        Customer,
        Message,
        Direction,
        Platform,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Webhooks", description = "Provider callbacks"),
        (name = "Orders", description = "Order registration and lookup"),
        (name = "Customers", description = "Customer conversations"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

//! # salespilot-gateway
//!
//! Webhook ingestion service for SalesPilots: signature-verified payment
//! events from Razorpay and direct messages from WhatsApp and Instagram.
//!
//! Each POST is verified (HMAC-SHA256 over the raw body), de-duplicated,
//! routed by event type and handled. Payment events settle the referenced
//! order; messages are recorded and, when the owning tenant has automation
//! enabled, answered with an AI-drafted reply.
//!
//! ## Architecture
//!
//! ```text
//! Providers (Razorpay, Meta)
//!     │
//!     ├── Webhook routes (api/)         signature check, ack
//!     ├── EventRouter (webhook/)        idempotency, dispatch table
//!     │
//!     ├── PaymentService (service/)     order state machine
//!     ├── MessagingService (service/)   customers, messages, replies
//!     │
//!     ├── Store (persistence/)          in-memory or PostgreSQL
//!     └── clients/                      OpenAI, Graph API
//! ```

pub mod api;
pub mod app_state;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod webhook;

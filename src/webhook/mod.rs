//! Webhook ingestion: provider payload shapes, signature verification and
//! the event router that dispatches verified deliveries to handlers.

pub mod meta;
pub mod razorpay;
pub mod router;
pub mod signature;

pub use router::{Dispatch, EventKind, EventRouter};

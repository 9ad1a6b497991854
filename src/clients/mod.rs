//! Clients for external collaborators: AI completion and the messaging
//! Graph API.

pub mod completion;
pub mod graph;

pub use completion::{OpenAiReplyGenerator, ReplyContext, ReplyGenerator};
pub use graph::{GraphApiSender, OutboundSender};

//! Core types for the runtime.
//!
//! - [`id`]: Identifier types (`ProcessId`, `Category`)
//! - [`message`]: Type-erased mailbox payloads

pub mod id;
pub mod message;

pub use id::{Category, ProcessId};
pub use message::Message;

//! Shared protocol types for fsaccess
//!
//! Defines the content-service models exchanged between a drive and the
//! file-browser front-end that consumes it.

pub mod contents;
pub mod messages;

pub use contents::*;
pub use messages::*;

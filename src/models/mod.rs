//! Data models for the attendance tracker.
//!
//! Wire shapes match the attendance service's JSON contract.

mod action;
mod message;
mod status;

pub use action::*;
pub use message::*;
pub use status::*;

//! Status view controller.
//!
//! Renders the latest status into a [`StatusView`] and dispatches UI intents
//! through an explicit table. All UI access goes through [`ViewBindings`].

mod controller;
mod dispatch;
mod format;

pub use controller::*;
pub use dispatch::*;

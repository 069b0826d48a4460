//! Control messages accepted by the offline shell.

use serde::{Deserialize, Serialize};

/// Fire-and-forget commands posted to the shell, e.g. `{"type":"SKIP_WAITING"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting cache generation now.
    SkipWaiting,
    /// Drop every entry of the current cache generation.
    ClearCache,
}

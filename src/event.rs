//! Event record and handler result types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Argument bag carried by an event.
pub type EventArgs = HashMap<String, serde_json::Value>;

/// A projection-tagged event.
///
/// Fields are read-only once constructed; stores hand events to handlers
/// without modifying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    id: String,
    projection: String,
    #[serde(default)]
    args: EventArgs,
}

impl Event {
    /// Create an event with a freshly generated id.
    ///
    /// The projection is not checked against any dispatcher here, so producers
    /// stay decoupled from whichever handlers exist at consume time.
    pub fn new(projection: impl Into<String>, args: EventArgs) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), projection, args)
    }

    /// Create an event with a caller-supplied id (may be empty).
    pub fn with_id(id: impl Into<String>, projection: impl Into<String>, args: EventArgs) -> Self {
        Self {
            id: id.into(),
            projection: projection.into(),
            args,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn args(&self) -> &EventArgs {
        &self.args
    }
}

/// Success payload returned by a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub message: String,
}

impl HandlerResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

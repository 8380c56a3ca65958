//! Wire encoding for broker traffic.
//!
//! Every message body is the JSON form of the full [`Event`]:
//! `{"id": "...", "projection": "...", "args": {...}}`.

use crate::error::{Result, StoreError};
use crate::event::Event;

/// Content type set on every published message.
pub const CONTENT_TYPE: &str = "application/json";

/// Serialize an event into a message body.
pub fn encode(event: &Event) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}

/// Deserialize a message body. Undecodable bodies are [`StoreError::InvalidEntry`].
pub fn decode(body: &[u8]) -> Result<Event> {
    serde_json::from_slice(body).map_err(|e| StoreError::InvalidEntry(e.to_string()))
}

//! Binary encoding and decoding of events.
//!
//! The wire format is the protobuf layout fixed by the field tags in
//! [`crate::event`]. Both directions run a structural check — an event must
//! name its device and carry an id, and every reading must be named — so an
//! empty shell never round-trips as a valid event and truncated or foreign
//! bytes fail instead of decoding to defaults.
//!
//! `decode` never panics; malformed input surfaces as [`BusError::Codec`].

use prost::Message;
use tracing::trace;

use crate::error::{BusError, Result};
use crate::event::Event;

/// Encode an event to its wire payload.
pub fn encode(event: &Event) -> Result<Vec<u8>> {
    validate(event)?;
    let payload = event.encode_to_vec();
    trace!("encoded event {} ({} bytes)", event.id, payload.len());
    Ok(payload)
}

/// Decode a wire payload back into an event.
pub fn decode(payload: &[u8]) -> Result<Event> {
    let event =
        Event::decode(payload).map_err(|e| BusError::Codec(format!("decode failed: {}", e)))?;
    validate(&event)?;
    Ok(event)
}

fn validate(event: &Event) -> Result<()> {
    if event.device.is_empty() {
        return Err(BusError::Codec("event has no device".into()));
    }
    if event.id.is_empty() {
        return Err(BusError::Codec("event has no id".into()));
    }
    for reading in &event.readings {
        if reading.name.is_empty() {
            return Err(BusError::Codec("reading has no name".into()));
        }
    }
    Ok(())
}

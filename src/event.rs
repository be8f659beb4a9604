//! Sensor event wire model.
//!
//! An [`Event`] is one batch of sensor readings from a device; the transport
//! treats it as opaque beyond the fields needed for the wire schema. The
//! structs double as the protobuf messages themselves via prost derives, so
//! the binary layout is fixed by the field tags below.
//!
//! Timestamps are milliseconds since the Unix epoch.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One sensor event, carrying zero or more readings.
#[derive(Clone, PartialEq, Serialize, Deserialize, prost::Message)]
pub struct Event {
    /// Device that produced the event.
    #[prost(string, tag = "1")]
    pub device: String,
    /// Unique event identifier.
    #[prost(string, tag = "2")]
    pub id: String,
    #[prost(int64, tag = "3")]
    pub created: i64,
    #[prost(int64, tag = "4")]
    pub modified: i64,
    #[prost(int64, tag = "5")]
    pub origin: i64,
    #[prost(int64, tag = "6")]
    pub pushed: i64,
    /// Readings in the order they were taken.
    #[prost(message, repeated, tag = "7")]
    pub readings: Vec<Reading>,
}

/// A single named measurement within an [`Event`].
#[derive(Clone, PartialEq, Serialize, Deserialize, prost::Message)]
pub struct Reading {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
    #[prost(string, tag = "3")]
    pub device: String,
    #[prost(string, tag = "4")]
    pub id: String,
    #[prost(int64, tag = "5")]
    pub created: i64,
    #[prost(int64, tag = "6")]
    pub modified: i64,
    #[prost(int64, tag = "7")]
    pub origin: i64,
    #[prost(int64, tag = "8")]
    pub pushed: i64,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(device: impl Into<String>, id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Event {
            device: device.into(),
            id: id.into(),
            created: now,
            origin: now,
            ..Default::default()
        }
    }

    /// Append a reading, preserving insertion order.
    pub fn with_reading(mut self, reading: Reading) -> Self {
        self.readings.push(reading);
        self
    }
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Reading {
            name: name.into(),
            value: value.into(),
            device: device.into(),
            created: now,
            origin: now,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_is_timestamped() {
        let event = Event::new("thermostat-1", "evt-1");
        assert_eq!(event.device, "thermostat-1");
        assert_eq!(event.id, "evt-1");
        assert!(event.created > 0);
        assert_eq!(event.created, event.origin);
        assert!(event.readings.is_empty());
    }

    #[test]
    fn readings_keep_insertion_order() {
        let event = Event::new("dev", "e1")
            .with_reading(Reading::new("temperature", "21.5", "dev"))
            .with_reading(Reading::new("humidity", "40", "dev"));
        let names: Vec<_> = event.readings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["temperature", "humidity"]);
    }
}

//! Lightweight ZeroMQ pub/sub transport for edge sensor events.
//!
//! Publishers bind a TCP endpoint and broadcast encoded [`Event`]s,
//! optionally tagged with a topic; subscribers connect and receive the
//! events whose topics match their registered prefixes. Delivery is
//! best-effort pub/sub: no broker, no durability, no compensation for the
//! slow-joiner window inherent to prefix-filtered subscriptions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edgebus::{Event, Publisher, Reading, Subscriber, TransportContext};
//!
//! let ctx = Arc::new(TransportContext::new());
//! ctx.initialize()?;
//!
//! let publisher = Publisher::new(ctx.clone(), 5562);
//! publisher.start()?;
//!
//! let (subscriber, mut deliveries) = Subscriber::new(ctx.clone(), "127.0.0.1", 5562);
//! subscriber.start()?;
//! subscriber.subscribe("home/livingroom")?;
//!
//! let event = Event::new("thermostat-1", "evt-1")
//!     .with_reading(Reading::new("temperature", "21.5", "thermostat-1"));
//! publisher.publish_on("home/livingroom", &event)?;
//!
//! let delivery = deliveries.blocking_recv().unwrap();
//! assert_eq!(delivery.topic.as_deref(), Some("home/livingroom/"));
//! ```
//!
//! # Topics
//!
//! Topics are path-shaped (`home/livingroom/`), limited to letters, digits
//! and `- _ . /`, and normalized to end with a trailing slash. Filtering is
//! prefix matching on the normalized form; subscribing to the empty prefix
//! receives everything, tagged or not.

pub mod codec;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod event;
pub mod publisher;
pub mod subscriber;
pub mod topic;

pub use config::{PublisherConfig, SubscriberConfig};
pub use context::{ContextStatus, TransportContext};
pub use error::{BusError, ErrorCode, Result};
pub use event::{Event, Reading};
pub use publisher::Publisher;
pub use subscriber::{Delivery, Subscriber};

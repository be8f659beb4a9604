//! Event publisher.
//!
//! A [`Publisher`] binds a PUB socket to `tcp://*:<port>` and broadcasts
//! encoded events, optionally tagged with a topic frame for subscriber-side
//! prefix filtering. Publishing is synchronous; there is no background
//! thread. All socket access is serialized by the instance lock, so a
//! topic/payload frame pair is always sent as one unit even under
//! concurrent callers.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::PublisherConfig;
use crate::context::TransportContext;
use crate::error::{BusError, Result};
use crate::event::Event;
use crate::topic;

/// Broadcast publisher for sensor events.
///
/// May be started, stopped and restarted any number of times; `stop()`
/// always leaves the instance ready for another `start()`.
pub struct Publisher {
    port: u16,
    config: PublisherConfig,
    ctx: Arc<TransportContext>,
    socket: Mutex<Option<zmq::Socket>>,
}

impl Publisher {
    /// Create a publisher for the given port with default configuration.
    pub fn new(ctx: Arc<TransportContext>, port: u16) -> Self {
        Self::with_config(ctx, port, PublisherConfig::default())
    }

    /// Create a publisher with explicit configuration.
    pub fn with_config(ctx: Arc<TransportContext>, port: u16, config: PublisherConfig) -> Self {
        Self {
            port,
            config,
            ctx,
            socket: Mutex::new(None),
        }
    }

    /// The port this publisher binds.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind the broadcast socket. A no-op when already started.
    pub fn start(&self) -> Result<()> {
        let mut socket = self.socket.lock();
        if socket.is_some() {
            return Ok(());
        }
        let s = self.ctx.socket(zmq::PUB)?;
        s.set_sndhwm(self.config.send_hwm)?;
        let endpoint = format!("tcp://*:{}", self.port);
        s.bind(&endpoint)?;
        debug!("publisher bound to {}", endpoint);
        *socket = Some(s);
        Ok(())
    }

    /// Publish an event without a topic tag as a single frame.
    pub fn publish(&self, event: &Event) -> Result<()> {
        let payload = codec::encode(event)?;
        let socket = self.socket.lock();
        let s = socket.as_ref().ok_or(BusError::SocketMissing)?;
        s.send(&*payload, 0)?;
        trace!("published untagged event {}", event.id);
        Ok(())
    }

    /// Publish an event on a topic as a two-frame message (topic, payload).
    ///
    /// The topic is validated and normalized before the event is encoded;
    /// an invalid topic is reported regardless of the event's state.
    pub fn publish_on(&self, raw_topic: &str, event: &Event) -> Result<()> {
        let normalized = topic::validate(raw_topic)?;
        let payload = codec::encode(event)?;
        let socket = self.socket.lock();
        let s = socket.as_ref().ok_or(BusError::SocketMissing)?;
        s.send(normalized.as_bytes(), zmq::SNDMORE)?;
        s.send(&*payload, 0)?;
        trace!("published event {} on topic {}", event.id, normalized);
        Ok(())
    }

    /// Publish an event on each topic in order.
    ///
    /// Stops at the first failure and returns it; topics already published
    /// to are not retracted (partial application, not atomic).
    pub fn publish_many(&self, topics: &[&str], event: &Event) -> Result<()> {
        for raw_topic in topics {
            self.publish_on(raw_topic, event)?;
        }
        Ok(())
    }

    /// Close the broadcast socket synchronously.
    ///
    /// Arms a close monitor on the socket, issues the close, then waits up
    /// to `close_timeout` for the monitor to confirm. The socket handle is
    /// released whether or not confirmation arrived in time.
    pub fn stop(&self) -> Result<()> {
        let mut socket = self.socket.lock();
        let s = socket.take().ok_or(BusError::SocketMissing)?;
        self.sync_close(s);
        debug!("publisher on port {} stopped", self.port);
        Ok(())
    }

    fn sync_close(&self, s: zmq::Socket) {
        let address = format!("inproc://edgebus-monitor-{}", Uuid::new_v4());
        if let Err(e) = s.monitor(&address, zmq::SocketEvent::CLOSED.to_raw() as i32) {
            warn!("failed to arm close monitor: {}", e);
            drop(s);
            return;
        }

        let monitor = match self.ctx.socket(zmq::PAIR) {
            Ok(m) => m,
            Err(e) => {
                warn!("failed to create monitor pair socket: {}", e);
                drop(s);
                return;
            }
        };
        if let Err(e) = monitor.connect(&address) {
            warn!("failed to connect monitor pair socket: {}", e);
            drop(s);
            return;
        }
        let timeout_ms = self.config.close_timeout.as_millis() as i32;
        if let Err(e) = monitor.set_rcvtimeo(timeout_ms) {
            warn!("failed to set monitor receive timeout: {}", e);
        }

        // Dropping the socket issues the close the monitor is watching for.
        drop(s);

        loop {
            match monitor.recv_bytes(0) {
                Ok(frame) => {
                    // Monitor events arrive as [event:u16, value:u32] plus an
                    // address frame.
                    if monitor.get_rcvmore().unwrap_or(false) {
                        let _ = monitor.recv_bytes(0);
                    }
                    if frame.len() >= 2
                        && u16::from_le_bytes([frame[0], frame[1]])
                            == zmq::SocketEvent::CLOSED.to_raw()
                    {
                        debug!("publisher socket close confirmed");
                        break;
                    }
                }
                Err(zmq::Error::EAGAIN) => {
                    warn!(
                        "no close confirmation within {:?}",
                        self.config.close_timeout
                    );
                    break;
                }
                Err(e) => {
                    warn!("monitor receive failed: {}", e);
                    break;
                }
            }
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        // Deterministic best-effort release; a never-started publisher has
        // nothing to close.
        let _ = self.stop();
    }
}

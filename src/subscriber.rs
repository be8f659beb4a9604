//! Event subscriber.
//!
//! A [`Subscriber`] connects a SUB socket to a publisher endpoint and runs
//! one dedicated receive loop per active instance. Decoded events are pushed
//! onto a bounded delivery channel as [`Delivery`] values; a slow consumer
//! backs up the channel and throttles the loop rather than wedging dispatch
//! inside it.
//!
//! ZeroMQ sockets are not thread-safe, so the loop owns the SUB socket
//! outright. Caller threads talk to it over an `inproc://` PAIR socket pair
//! created per `start()`: subscription changes and shutdown travel as small
//! control messages, each acknowledged by the loop. The PAIR client sits in
//! the loop's poll set next to the SUB socket, which is what lets `stop()`
//! wake a receive loop that would otherwise block indefinitely.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::SubscriberConfig;
use crate::context::TransportContext;
use crate::discovery;
use crate::error::{BusError, Result};
use crate::event::Event;
use crate::topic;

const CMD_SUBSCRIBE: &[u8] = b"SUB";
const CMD_UNSUBSCRIBE: &[u8] = b"UNSUB";
const CMD_TERMINATE: &[u8] = b"TERM";
const REPLY_OK: &[u8] = b"OK";
const REPLY_ERR: &[u8] = b"ERR";

/// One received message: the decoded event plus its topic tag, if the
/// publisher sent one.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Normalized topic from the leading frame; `None` for untagged sends.
    pub topic: Option<String>,
    pub event: Event,
}

enum Endpoint {
    Address { host: String, port: u16 },
    Service { name: String },
}

impl Endpoint {
    fn resolve(&self) -> Result<String> {
        match self {
            Endpoint::Address { host, port } => Ok(format!("tcp://{}:{}", host, port)),
            Endpoint::Service { name } => {
                let (host, port) = discovery::resolve(name)?;
                Ok(format!("tcp://{}:{}", host, port))
            }
        }
    }
}

/// Handles owned while the subscriber is active, between `start()` and
/// `stop()`.
struct Active {
    /// PAIR server side; the loop holds the connected client.
    control: zmq::Socket,
    handle: Option<thread::JoinHandle<()>>,
}

/// Topic-filtering subscriber for sensor events.
///
/// May be started, stopped and restarted any number of times; the delivery
/// channel handed out at construction survives restarts.
pub struct Subscriber {
    endpoint: Endpoint,
    config: SubscriberConfig,
    ctx: Arc<TransportContext>,
    deliveries: mpsc::Sender<Delivery>,
    active: Mutex<Option<Active>>,
}

impl Subscriber {
    /// Create a subscriber for `tcp://<host>:<port>` with default
    /// configuration. Returns the instance and the delivery channel.
    pub fn new(
        ctx: Arc<TransportContext>,
        host: impl Into<String>,
        port: u16,
    ) -> (Self, mpsc::Receiver<Delivery>) {
        Self::with_config(ctx, host, port, SubscriberConfig::default())
    }

    /// Create a subscriber with explicit configuration.
    pub fn with_config(
        ctx: Arc<TransportContext>,
        host: impl Into<String>,
        port: u16,
        config: SubscriberConfig,
    ) -> (Self, mpsc::Receiver<Delivery>) {
        Self::build(
            ctx,
            Endpoint::Address {
                host: host.into(),
                port,
            },
            config,
        )
    }

    /// Create a subscriber that resolves a service name to an endpoint at
    /// `start()`. Resolution is delegated to [`crate::discovery`], which is
    /// currently a stub, so `start()` reports the resolution failure.
    pub fn for_service(
        ctx: Arc<TransportContext>,
        name: impl Into<String>,
    ) -> (Self, mpsc::Receiver<Delivery>) {
        Self::build(
            ctx,
            Endpoint::Service { name: name.into() },
            SubscriberConfig::default(),
        )
    }

    fn build(
        ctx: Arc<TransportContext>,
        endpoint: Endpoint,
        config: SubscriberConfig,
    ) -> (Self, mpsc::Receiver<Delivery>) {
        let (deliveries, receiver) = mpsc::channel(config.channel_capacity);
        (
            Self {
                endpoint,
                config,
                ctx,
                deliveries,
                active: Mutex::new(None),
            },
            receiver,
        )
    }

    /// Connect the inbound socket and spawn the receive loop. A no-op when
    /// already started. On any failure the partially created handles are
    /// released and the instance stays idle, ready for another `start()`.
    pub fn start(&self) -> Result<()> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Ok(());
        }

        let endpoint = self.endpoint.resolve()?;

        // Unique control address so concurrent instances never collide.
        let control_address = format!("inproc://edgebus-ctl-{}", Uuid::new_v4());
        let control = self.ctx.socket(zmq::PAIR)?;
        control.set_linger(0)?;
        control.set_rcvtimeo(self.config.control_timeout.as_millis() as i32)?;
        control.set_sndtimeo(self.config.control_timeout.as_millis() as i32)?;
        control.bind(&control_address)?;

        let loop_control = self.ctx.socket(zmq::PAIR)?;
        loop_control.set_linger(0)?;
        loop_control.set_sndtimeo(self.config.control_timeout.as_millis() as i32)?;
        loop_control.connect(&control_address)?;

        let subscription = self.ctx.socket(zmq::SUB)?;
        subscription.set_linger(0)?;
        subscription.connect(&endpoint)?;

        let deliveries = self.deliveries.clone();
        let handle = thread::Builder::new()
            .name("edgebus-subscriber".into())
            .spawn(move || receive_loop(subscription, loop_control, deliveries))?;

        debug!("subscriber connected to {}", endpoint);
        *active = Some(Active {
            control,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Register the empty prefix, which matches every topic as well as
    /// untagged sends.
    pub fn subscribe_all(&self) -> Result<()> {
        self.control_request(CMD_SUBSCRIBE, "")
    }

    /// Register a topic-prefix filter. The topic is validated and
    /// normalized first; invalid input registers nothing.
    pub fn subscribe(&self, raw_topic: &str) -> Result<()> {
        let normalized = topic::validate(raw_topic)?;
        self.control_request(CMD_SUBSCRIBE, &normalized)
    }

    /// Register each topic in order. Stops at the first failure and returns
    /// it; filters registered before the failure stay active.
    pub fn subscribe_many(&self, topics: &[&str]) -> Result<()> {
        for raw_topic in topics {
            self.subscribe(raw_topic)?;
        }
        Ok(())
    }

    /// Remove the match-everything filter registered by
    /// [`Subscriber::subscribe_all`].
    pub fn unsubscribe_all(&self) -> Result<()> {
        self.control_request(CMD_UNSUBSCRIBE, "")
    }

    /// Remove a topic-prefix filter. Validation mirrors
    /// [`Subscriber::subscribe`].
    pub fn unsubscribe(&self, raw_topic: &str) -> Result<()> {
        let normalized = topic::validate(raw_topic)?;
        self.control_request(CMD_UNSUBSCRIBE, &normalized)
    }

    /// Remove each topic in order; first failure aborts, prior removals
    /// stand.
    pub fn unsubscribe_many(&self, topics: &[&str]) -> Result<()> {
        for raw_topic in topics {
            self.unsubscribe(raw_topic)?;
        }
        Ok(())
    }

    fn control_request(&self, verb: &[u8], filter: &str) -> Result<()> {
        let active = self.active.lock();
        let active = active.as_ref().ok_or(BusError::NotStarted)?;

        // Drop any stale reply left over from a timed-out request.
        while active.control.recv_bytes(zmq::DONTWAIT).is_ok() {}

        active.control.send(verb, zmq::SNDMORE)?;
        active.control.send(filter.as_bytes(), 0)?;
        let reply = active.control.recv_bytes(0)?;
        if reply == REPLY_OK {
            Ok(())
        } else {
            Err(BusError::ControlRejected)
        }
    }

    /// Wake the receive loop, wait (bounded) for it to exit, and release
    /// every handle.
    ///
    /// On an idle instance this is a no-op returning `Ok`. If the loop does
    /// not confirm shutdown within `stop_timeout` it is abandoned and
    /// [`BusError::ShutdownTimeout`] is reported; the handles are reset
    /// regardless, so a subsequent `start()` acquires cleanly.
    pub fn stop(&self) -> Result<()> {
        let mut guard = self.active.lock();
        let Some(mut active) = guard.take() else {
            debug!("stop on idle subscriber");
            return Ok(());
        };

        let timeout_ms = self.config.stop_timeout.as_millis() as i32;
        if let Err(e) = active.control.set_rcvtimeo(timeout_ms) {
            warn!("failed to extend control timeout for shutdown: {}", e);
        }

        // Drop any stale reply left over from a timed-out request.
        while active.control.recv_bytes(zmq::DONTWAIT).is_ok() {}

        let result = match active.control.send(CMD_TERMINATE, 0) {
            Ok(()) => match active.control.recv_bytes(0) {
                Ok(_) => {
                    if let Some(handle) = active.handle.take() {
                        let _ = handle.join();
                    }
                    debug!("subscriber stopped");
                    Ok(())
                }
                Err(zmq::Error::EAGAIN) => {
                    warn!(
                        "receive loop did not confirm shutdown within {:?}",
                        self.config.stop_timeout
                    );
                    Err(BusError::ShutdownTimeout)
                }
                Err(e) => Err(BusError::Transport(e)),
            },
            Err(e) => Err(BusError::Transport(e)),
        };

        // Dropping `active` closes the control socket; an unjoined loop
        // thread is detached rather than waited on forever.
        drop(active);
        result
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Dedicated receive loop: the sole owner of the SUB socket.
///
/// Blocks in `poll` over the inbound socket and the control pair — the only
/// suspension point — until data or a control message arrives.
fn receive_loop(
    subscription: zmq::Socket,
    control: zmq::Socket,
    deliveries: mpsc::Sender<Delivery>,
) {
    loop {
        let mut items = [
            subscription.as_poll_item(zmq::POLLIN),
            control.as_poll_item(zmq::POLLIN),
        ];
        match zmq::poll(&mut items, -1) {
            Ok(_) => {}
            Err(zmq::Error::EINTR) => continue,
            Err(e) => {
                error!("subscriber poll failed: {}", e);
                break;
            }
        }
        let inbound_ready = items[0].is_readable();
        let control_ready = items[1].is_readable();

        if inbound_ready {
            forward_message(&subscription, &deliveries);
        }
        if control_ready && !handle_control(&subscription, &control) {
            break;
        }
    }
    debug!("subscriber receive loop exited");
}

/// Receive one (possibly multipart) message and push it into the delivery
/// channel. The first frame is the payload unless more frames follow, in
/// which case it is the topic tag.
fn forward_message(subscription: &zmq::Socket, deliveries: &mpsc::Sender<Delivery>) {
    let first = match subscription.recv_bytes(0) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("subscriber receive failed: {}", e);
            return;
        }
    };

    let (tag, payload) = if subscription.get_rcvmore().unwrap_or(false) {
        match subscription.recv_bytes(0) {
            Ok(payload) => (Some(first), payload),
            Err(e) => {
                warn!("subscriber payload receive failed: {}", e);
                return;
            }
        }
    } else {
        (None, first)
    };

    let event = match codec::decode(&payload) {
        Ok(event) => event,
        Err(e) => {
            debug!("dropping undecodable payload: {}", e);
            return;
        }
    };

    let topic = tag.map(|t| String::from_utf8_lossy(&t).into_owned());
    trace!("received event {} (topic: {:?})", event.id, topic);
    if deliveries.blocking_send(Delivery { topic, event }).is_err() {
        warn!("delivery channel closed, dropping event");
    }
}

/// Apply one control message. Returns `false` when the loop should exit.
fn handle_control(subscription: &zmq::Socket, control: &zmq::Socket) -> bool {
    let frames = match control.recv_multipart(0) {
        Ok(frames) => frames,
        Err(e) => {
            error!("control receive failed: {}", e);
            return false;
        }
    };

    let verb = frames.first().map(Vec::as_slice).unwrap_or_default();
    if verb == CMD_TERMINATE {
        debug!("received shutdown request");
        let _ = control.send(REPLY_OK, 0);
        false
    } else if verb == CMD_SUBSCRIBE || verb == CMD_UNSUBSCRIBE {
        let filter = frames.get(1).map(Vec::as_slice).unwrap_or_default();
        let applied = if verb == CMD_SUBSCRIBE {
            subscription.set_subscribe(filter)
        } else {
            subscription.set_unsubscribe(filter)
        };
        let reply = match applied {
            Ok(()) => REPLY_OK,
            Err(e) => {
                error!("failed to update subscription filter: {}", e);
                REPLY_ERR
            }
        };
        let _ = control.send(reply, 0);
        true
    } else {
        warn!("unknown control verb: {:?}", verb);
        let _ = control.send(REPLY_ERR, 0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn initialized_ctx() -> Arc<TransportContext> {
        let ctx = Arc::new(TransportContext::new());
        ctx.initialize().unwrap();
        ctx
    }

    #[test]
    fn start_requires_initialized_context() {
        let ctx = Arc::new(TransportContext::new());
        let (subscriber, _rx) = Subscriber::new(ctx, "127.0.0.1", 5590);
        assert!(matches!(subscriber.start(), Err(BusError::ContextMissing)));
    }

    #[test]
    fn stop_on_idle_instance_is_ok() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5591);
        subscriber.stop().unwrap();
        subscriber.stop().unwrap();
    }

    #[test]
    fn subscribe_before_start_fails() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5592);
        assert!(matches!(
            subscriber.subscribe("topic"),
            Err(BusError::NotStarted)
        ));
        assert!(matches!(
            subscriber.subscribe_all(),
            Err(BusError::NotStarted)
        ));
        assert!(matches!(
            subscriber.unsubscribe("topic"),
            Err(BusError::NotStarted)
        ));
    }

    #[test]
    fn invalid_topic_is_rejected_before_the_socket_is_consulted() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5593);
        // Not started, yet validation still wins.
        let result = subscriber.subscribe("bad topic");
        assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidTopic);
    }

    #[test]
    fn start_is_idempotent() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5594);
        subscriber.start().unwrap();
        subscriber.start().unwrap();
        subscriber.stop().unwrap();
    }

    #[test]
    fn restart_cycle() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5595);
        for _ in 0..3 {
            subscriber.start().unwrap();
            subscriber.subscribe("topic").unwrap();
            subscriber.stop().unwrap();
        }
    }

    #[test]
    fn subscribe_many_aborts_on_first_invalid_entry() {
        let (subscriber, _rx) = Subscriber::new(initialized_ctx(), "127.0.0.1", 5596);
        subscriber.start().unwrap();
        let result = subscriber.subscribe_many(&["t1", "bad topic", "t2"]);
        assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidTopic);
        // t1 is still registered; removing it succeeds.
        subscriber.unsubscribe("t1").unwrap();
        subscriber.stop().unwrap();
    }

    #[test]
    fn service_name_resolution_failure_surfaces_from_start() {
        let (subscriber, _rx) = Subscriber::for_service(initialized_ctx(), "device-service-1");
        assert!(matches!(subscriber.start(), Err(BusError::Unresolved(_))));
        // The instance stays idle and cleanly stoppable.
        subscriber.stop().unwrap();
    }
}

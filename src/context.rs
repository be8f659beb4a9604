//! Shared transport context management.
//!
//! A [`TransportContext`] owns the underlying ZeroMQ context. One handle is
//! created per process (or per test), wrapped in an `Arc`, and injected into
//! every [`crate::Publisher`] and [`crate::Subscriber`] so that all sockets
//! share a context and the caller controls the init/terminate bracketing.
//! Dropping the last handle releases the context deterministically.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{BusError, Result};

/// Lifecycle state of a [`TransportContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextStatus {
    /// Never observed; the default before construction completes.
    #[default]
    Unknown,
    /// Handle exists but `initialize()` has not been called.
    Constructed,
    /// Underlying context is live; sockets can be created.
    Initialized,
    /// Underlying context has been released.
    Terminated,
}

struct Inner {
    context: Option<zmq::Context>,
    status: ContextStatus,
}

/// Process-wide handle to the underlying socket context.
///
/// Using a publisher or subscriber before `initialize()` (or after
/// `terminate()`) fails with [`BusError::ContextMissing`].
pub struct TransportContext {
    inner: Mutex<Inner>,
}

impl TransportContext {
    /// Create an uninitialized context handle.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                context: None,
                status: ContextStatus::Constructed,
            }),
        }
    }

    /// Create the underlying context if absent. Idempotent; a context that
    /// was terminated can be initialized again.
    pub fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.context.is_none() {
            inner.context = Some(zmq::Context::new());
        }
        inner.status = ContextStatus::Initialized;
        debug!("transport context initialized");
        Ok(())
    }

    /// Release the underlying context if present. Safe to call when already
    /// terminated.
    pub fn terminate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.context.take().is_some() {
            inner.status = ContextStatus::Terminated;
            debug!("transport context terminated");
        }
        Ok(())
    }

    /// Current lifecycle status. No side effects.
    pub fn status(&self) -> ContextStatus {
        self.inner.lock().status
    }

    /// Create a socket from the shared context.
    pub(crate) fn socket(&self, kind: zmq::SocketType) -> Result<zmq::Socket> {
        let inner = self.inner.lock();
        let context = inner.context.as_ref().ok_or(BusError::ContextMissing)?;
        Ok(context.socket(kind)?)
    }
}

impl Default for TransportContext {
    fn default() -> Self {
        Self::new()
    }
}

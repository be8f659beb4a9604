//! Service-name endpoint resolution.
//!
//! [`crate::Subscriber::for_service`] defers to this module when it needs an
//! address for a named service. There is no registry integration yet: every
//! lookup fails with [`BusError::Unresolved`], and the subscriber reports
//! that failure from `start()`. This is the seam where a real lookup
//! (consul, mDNS, a static map) would plug in.

use tracing::debug;

use crate::error::{BusError, Result};

/// Resolve a service name to a `(host, port)` endpoint.
pub fn resolve(service_name: &str) -> Result<(String, u16)> {
    debug!("service resolution requested for '{}'", service_name);
    Err(BusError::Unresolved(service_name.to_owned()))
}

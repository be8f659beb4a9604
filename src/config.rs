//! Configuration for publishers and subscribers.

use std::time::Duration;

/// Configuration for a [`crate::Publisher`].
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// High water mark for outbound messages (0 = unlimited).
    pub send_hwm: i32,
    /// How long `stop()` waits for close confirmation from the socket
    /// monitor before giving up. The socket is released either way.
    pub close_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            send_hwm: 1000,
            close_timeout: Duration::from_secs(1),
        }
    }
}

/// Configuration for a [`crate::Subscriber`].
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Capacity of the delivery channel. When full, the receive loop blocks
    /// until the consumer catches up.
    pub channel_capacity: usize,
    /// How long subscribe/unsubscribe requests wait for the receive loop's
    /// acknowledgement.
    pub control_timeout: Duration,
    /// How long `stop()` waits for the receive loop to exit before reporting
    /// a shutdown timeout. Handles are reset either way.
    pub stop_timeout: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
            control_timeout: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let publisher = PublisherConfig::default();
        assert_eq!(publisher.send_hwm, 1000);
        assert_eq!(publisher.close_timeout, Duration::from_secs(1));

        let subscriber = SubscriberConfig::default();
        assert_eq!(subscriber.channel_capacity, 1000);
        assert_eq!(subscriber.control_timeout, Duration::from_secs(1));
        assert_eq!(subscriber.stop_timeout, Duration::from_secs(5));
    }
}

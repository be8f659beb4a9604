//! Error types for the edgebus transport layer.
//!
//! Every public operation returns `Result<(), BusError>`. Callers that only
//! care about the coarse outcome can collapse any error to an [`ErrorCode`]
//! via [`BusError::code`]; the fine-grained variants exist so logs and tests
//! can tell a missing socket from a codec failure.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BusError>;

/// Coarse outcome of a transport operation.
///
/// This is the only classification the wire protocol itself distinguishes:
/// success, invalid topic input, and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Operation succeeded.
    Ok,
    /// Operation failed (missing context/socket, transport or codec error).
    Error,
    /// A topic failed validation; nothing was sent or registered for it.
    InvalidTopic,
}

impl ErrorCode {
    /// Classify a transport result.
    pub fn of<T>(result: &Result<T>) -> ErrorCode {
        match result {
            Ok(_) => ErrorCode::Ok,
            Err(e) => e.code(),
        }
    }
}

/// Errors produced by the transport layer.
///
/// Underlying ZeroMQ errors are converted at each public operation's
/// boundary; none of them panic or propagate as anything but a variant here.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("transport context is not initialized")]
    ContextMissing,

    #[error("socket has not been started")]
    SocketMissing,

    #[error("subscriber is not started")]
    NotStarted,

    #[error("invalid topic")]
    InvalidTopic,

    #[error("codec error: {0}")]
    Codec(String),

    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),

    #[error("receive loop did not shut down in time")]
    ShutdownTimeout,

    #[error("subscription update rejected by receive loop")]
    ControlRejected,

    #[error("service name could not be resolved: {0}")]
    Unresolved(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Collapse to the coarse [`ErrorCode`] taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            BusError::InvalidTopic => ErrorCode::InvalidTopic,
            _ => ErrorCode::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_topic_maps_to_its_own_code() {
        assert_eq!(BusError::InvalidTopic.code(), ErrorCode::InvalidTopic);
    }

    #[test]
    fn transport_errors_collapse_to_error() {
        assert_eq!(BusError::ContextMissing.code(), ErrorCode::Error);
        assert_eq!(BusError::SocketMissing.code(), ErrorCode::Error);
        assert_eq!(BusError::ShutdownTimeout.code(), ErrorCode::Error);
        assert_eq!(
            BusError::Transport(zmq::Error::EAGAIN).code(),
            ErrorCode::Error
        );
    }

    #[test]
    fn error_code_of_result() {
        assert_eq!(ErrorCode::of(&Ok(())), ErrorCode::Ok);
        assert_eq!(
            ErrorCode::of::<()>(&Err(BusError::InvalidTopic)),
            ErrorCode::InvalidTopic
        );
    }
}

//! Error types used by the lobbyvisor runtime, its services and the transport seam.
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (shutdown).
//! - [`ServiceError`]: errors raised by one supervised service.
//! - [`TransportError`]: failures of the publish/subscribe collaborator.
//! - [`TopicError`]: non-fatal problems with an inbound message.
//! - [`ConfigError`]: invalid environment overrides.
//! - [`HostError`]: failures of the top-level host.
//!
//! Every enum provides `as_label` (stable snake_case for logs) in the same manner.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some services were still registered.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The grace duration that was applied.
        grace: Duration,
        /// Names of services that did not exit in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use lobbyvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by a supervised service.
///
/// [`ServiceError::Stopped`] is not a failure: it is how the cancellation-aware
/// [`ServiceContext::sleep`](crate::ServiceContext::sleep) unwinds a `run` loop,
/// and the supervisor records it as a normal stop.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Cancellation was requested while the service was suspended.
    #[error("service stopped")]
    Stopped,

    /// Setup failed; the service never reached init-done.
    #[error("init failed: {error}")]
    Init {
        /// The underlying error message.
        error: String,
    },

    /// The service main loop failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The transport collaborator failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// A live service with the same name is already registered.
    #[error("service {name:?} is already running")]
    AlreadyRunning {
        /// Conflicting service name.
        name: String,
    },

    /// Waiting for init-done exceeded the caller's timeout.
    #[error("timed out waiting for init after {timeout:?}")]
    InitTimeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use lobbyvisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::Stopped.as_label(), "service_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Stopped => "service_stopped",
            ServiceError::Init { .. } => "service_init_failed",
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Transport(_) => "service_transport",
            ServiceError::AlreadyRunning { .. } => "service_already_running",
            ServiceError::InitTimeout { .. } => "service_init_timeout",
        }
    }

    /// Returns `true` for the cancellation outcome.
    pub fn is_stopped(&self) -> bool {
        matches!(self, ServiceError::Stopped)
    }
}

/// # Errors produced by a [`Transport`](crate::Transport) implementation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The session could not be established.
    #[error("connect failed: {reason}")]
    Connect {
        /// Broker-provided reason.
        reason: String,
    },

    /// Operation requires a connected session.
    #[error("not connected")]
    NotConnected,

    /// The broker has shut down.
    #[error("broker closed")]
    Closed,

    /// Topic or pattern is not well formed.
    #[error("invalid topic {topic:?}")]
    InvalidTopic {
        /// Offending topic.
        topic: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "transport_connect",
            TransportError::NotConnected => "transport_not_connected",
            TransportError::Closed => "transport_closed",
            TransportError::InvalidTopic { .. } => "transport_invalid_topic",
        }
    }
}

/// # Non-fatal problems with an inbound lobby message.
///
/// These are logged and the message is dropped without any state transition.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// Payload is neither `"1"` nor `"0"`.
    #[error("unknown payload {payload:?} on {topic:?}")]
    MalformedPayload {
        /// Topic the message arrived on.
        topic: String,
        /// Offending payload.
        payload: String,
    },

    /// The topic does not carry a usable player segment.
    #[error("no player segment in {topic:?}")]
    UnknownPlayerSegment {
        /// Offending topic.
        topic: String,
    },
}

impl TopicError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TopicError::MalformedPayload { .. } => "topic_malformed_payload",
            TopicError::UnknownPlayerSegment { .. } => "topic_unknown_player",
        }
    }
}

/// # Invalid configuration overrides.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration variable is not a finite, non-negative number of seconds.
    #[error("{key}={value:?} is not a valid duration in seconds")]
    InvalidDuration {
        /// Environment variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// # Errors surfaced by [`Host`](crate::Host).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// The lobby could not be started.
    #[error("lobby start failed: {0}")]
    Start(#[from] ServiceError),

    /// Shutdown did not complete within the grace period.
    #[error(transparent)]
    Shutdown(#[from] RuntimeError),

    /// Registering for termination signals failed.
    #[error("signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::Start(_) => "host_start",
            HostError::Shutdown(_) => "host_shutdown",
            HostError::Signal(_) => "host_signal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts_into_service_error() {
        let err: ServiceError = TransportError::NotConnected.into();
        assert_eq!(err, ServiceError::Transport(TransportError::NotConnected));
        assert_eq!(err.as_label(), "service_transport");
        assert!(!err.is_stopped());
    }

    #[test]
    fn test_display_messages() {
        let err = TopicError::MalformedPayload {
            topic: "7/join".into(),
            payload: "2".into(),
        };
        assert_eq!(err.to_string(), r#"unknown payload "2" on "7/join""#);

        let err = ConfigError::InvalidDuration {
            key: "SH_JOIN_GAME_DELAY",
            value: "-1".into(),
        };
        assert!(err.to_string().starts_with("SH_JOIN_GAME_DELAY="));
    }
}

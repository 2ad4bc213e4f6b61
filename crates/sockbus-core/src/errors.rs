//! Error taxonomy shared by the bus adapters and the gateway.
//!
//! Each failure domain gets its own enum so callers can tell apart
//! what is fatal to a session, what is fatal to the process, and what
//! is merely logged.

use thiserror::Error;

/// A topic list could not be parsed from the client's request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TopicParseError {
    #[error("topics cannot be empty")]
    Empty,
}

/// The backend rejected or could not deliver a publish. Non-fatal to
/// the publisher's session; recorded and dropped (best-effort
/// delivery, no acknowledgment channel back to the publisher exists).
#[derive(Clone, Debug, Error)]
pub enum PublishError {
    #[error("backend rejected publish to {topic}: {reason}")]
    Backend { topic: String, reason: String },
    #[error("bus connection lost")]
    ConnectionLost,
}

/// The backend refused or failed to establish a subscription. Fatal
/// to the one session being set up (which must not proceed with a
/// partial topic set), never to the process. Adapters guarantee no
/// partial subscription survives this error.
#[derive(Clone, Debug, Error)]
pub enum SubscribeError {
    #[error("backend refused subscription to {topics}: {reason}")]
    Backend { topics: String, reason: String },
    #[error("bus connection lost")]
    ConnectionLost,
}

/// The bus driver could not be constructed. Only surfaced at startup,
/// where it is process-fatal.
#[derive(Clone, Debug, Error)]
pub enum ConnectError {
    #[error("cannot reach {backend} at {address}: {reason}")]
    Unreachable {
        backend: &'static str,
        address: String,
        reason: String,
    },
}

impl PublishError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Backend { .. } => "backend_rejected",
            Self::ConnectionLost => "connection_lost",
        }
    }
}

impl SubscribeError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Backend { .. } => "backend_refused",
            Self::ConnectionLost => "connection_lost",
        }
    }
}

//! Shared types for the sockbus gateway: the bus message shape, topic
//! sets, the client frame format, and the error taxonomy used across
//! the bus adapters and the connection sessions.

pub mod errors;
pub mod message;
pub mod topics;

pub use errors::{ConnectError, PublishError, SubscribeError, TopicParseError};
pub use message::{ClientFrame, Message};
pub use topics::TopicSet;

//! Bus drivers: a capability trait over interchangeable pub/sub
//! backends, plus the adapters for Redis, NATS, and an in-process
//! broadcast bus.
//!
//! One driver instance is shared by every connection session in the
//! process; `publish` and `subscribe` are safe to call concurrently
//! from any task with no external locking.

use async_trait::async_trait;
use bytes::Bytes;
use sockbus_core::{PublishError, SubscribeError, TopicSet};

pub mod driver;
pub mod memory;
pub mod nats;
pub mod redis;
pub mod subscription;

pub use driver::connect;
pub use memory::MemoryBus;
pub use nats::NatsBus;
pub use redis::RedisBus;
pub use subscription::{ReleaseHandle, Subscription};

/// Capability interface every backend adapter implements.
///
/// `subscribe` covers the whole topic set in one logical call: either
/// the returned [`Subscription`] delivers for every requested topic,
/// or the error leaves nothing registered on the backend.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish a payload to a topic. Best-effort: the backend fans the
    /// message out to currently-live subscriptions; a failure here is
    /// non-fatal to the publisher and carries no delivery guarantee.
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError>;

    /// Create one subscription covering all requested topics.
    async fn subscribe(&self, topics: &TopicSet) -> Result<Subscription, SubscribeError>;
}

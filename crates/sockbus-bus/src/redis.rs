//! Store-based backend: Redis pub/sub.
//!
//! Publishes go through a shared multiplexed connection. Each
//! subscribe opens a dedicated pub/sub connection covering every
//! requested topic in one SUBSCRIBE, then a demux task pushes
//! delivered records into the subscription channel. Dropping that
//! connection is the rollback/release path; nothing survives it on
//! the server side.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use redis::AsyncCommands;
use sockbus_core::{ConnectError, Message, PublishError, SubscribeError, TopicSet};

use crate::subscription::{delivery_channel, Subscription};
use crate::Bus;

#[derive(Debug)]
pub struct RedisBus {
    client: redis::Client,
    conn: redis::aio::MultiplexedConnection,
    delivery_buffer: usize,
}

impl RedisBus {
    /// Connect and verify the server responds to PING.
    pub async fn connect(url: &str, delivery_buffer: usize) -> Result<Self, ConnectError> {
        let unreachable = |reason: String| ConnectError::Unreachable {
            backend: "redis",
            address: url.to_string(),
            reason,
        };

        let client = redis::Client::open(url).map_err(|e| unreachable(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        Ok(Self {
            client,
            conn,
            delivery_buffer,
        })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(topic, payload.as_ref())
            .await
            .map_err(|e| {
                if e.is_connection_dropped() || e.is_io_error() {
                    PublishError::ConnectionLost
                } else {
                    PublishError::Backend {
                        topic: topic.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;
        if receivers == 0 {
            tracing::debug!(topic = %topic, "publish reached no live subscribers");
        } else {
            tracing::trace!(topic = %topic, receivers, "published to redis");
        }
        Ok(())
    }

    async fn subscribe(&self, topics: &TopicSet) -> Result<Subscription, SubscribeError> {
        let backend_err = |e: redis::RedisError| {
            if e.is_connection_dropped() || e.is_io_error() {
                SubscribeError::ConnectionLost
            } else {
                SubscribeError::Backend {
                    topics: topics.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        // A dedicated connection per subscription; on any failure
        // below, dropping it unregisters whatever was established.
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(&backend_err)?;
        for topic in topics.iter() {
            pubsub.subscribe(topic).await.map_err(&backend_err)?;
        }

        let (tx, token, subscription) = delivery_channel(topics.clone(), self.delivery_buffer);
        let topic_list = topics.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    item = stream.next() => match item {
                        Some(raw) => {
                            let msg = Message::new(
                                raw.get_channel_name().to_string(),
                                Bytes::copy_from_slice(raw.get_payload_bytes()),
                            );
                            if tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::warn!(topics = %topic_list, "redis pub/sub stream ended");
                            break;
                        }
                    },
                }
            }
            tracing::debug!(topics = %topic_list, "redis subscription released");
        });

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let err = RedisBus::connect("definitely-not-a-redis-url", 16)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::Unreachable { backend: "redis", .. }));
    }
}

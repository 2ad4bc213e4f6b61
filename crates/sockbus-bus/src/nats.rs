//! Broker-based backend: NATS core pub/sub.
//!
//! NATS subscribes one subject at a time, so a multi-topic subscribe
//! creates one subscriber per subject and unsubscribes every
//! already-created one if a later subject fails; no partial
//! subscription ever reaches the caller. A demux task merges the
//! subject streams into the subscription channel.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use sockbus_core::{ConnectError, Message, PublishError, SubscribeError, TopicSet};

use crate::subscription::{delivery_channel, Subscription};
use crate::Bus;

#[derive(Debug)]
pub struct NatsBus {
    client: async_nats::Client,
    delivery_buffer: usize,
}

impl NatsBus {
    pub async fn connect(url: &str, delivery_buffer: usize) -> Result<Self, ConnectError> {
        let client =
            async_nats::connect(url)
                .await
                .map_err(|e| ConnectError::Unreachable {
                    backend: "nats",
                    address: url.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(Self {
            client,
            delivery_buffer,
        })
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        self.client
            .publish(topic.to_string(), payload)
            .await
            .map_err(|e| PublishError::Backend {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        tracing::trace!(topic = %topic, "published to nats");
        Ok(())
    }

    async fn subscribe(&self, topics: &TopicSet) -> Result<Subscription, SubscribeError> {
        let mut subscribers = Vec::with_capacity(topics.len());
        for topic in topics.iter() {
            match self.client.subscribe(topic.to_string()).await {
                Ok(sub) => subscribers.push(sub),
                Err(e) => {
                    // Roll back what was already established before
                    // reporting the failure.
                    for mut sub in subscribers {
                        let _ = sub.unsubscribe().await;
                    }
                    return Err(SubscribeError::Backend {
                        topics: topics.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let (tx, token, subscription) = delivery_channel(topics.clone(), self.delivery_buffer);
        let topic_list = topics.to_string();
        tokio::spawn(async move {
            let mut merged = futures::stream::select_all(subscribers);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    item = merged.next() => match item {
                        Some(raw) => {
                            let msg = Message::new(raw.subject.to_string(), raw.payload);
                            if tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::warn!(topics = %topic_list, "nats subscriber streams ended");
                            break;
                        }
                    },
                }
            }
            for mut sub in merged.into_iter() {
                let _ = sub.unsubscribe().await;
            }
            tracing::debug!(topics = %topic_list, "nats subscription released");
        });

        Ok(subscription)
    }
}

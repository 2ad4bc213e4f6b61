//! In-process bus backed by per-topic broadcast channels. No external
//! services; this is the development default and the backend the
//! integration tests run against.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use sockbus_core::{Message, PublishError, SubscribeError, TopicSet};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::subscription::{delivery_channel, Subscription};
use crate::Bus;

pub struct MemoryBus {
    channels: Arc<DashMap<String, broadcast::Sender<Message>>>,
    live_subscriptions: Arc<AtomicUsize>,
    delivery_buffer: usize,
}

impl MemoryBus {
    pub fn new(delivery_buffer: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            live_subscriptions: Arc::new(AtomicUsize::new(0)),
            delivery_buffer,
        }
    }

    /// Number of subscriptions whose demux task is still running.
    /// Lets tests assert that failed or torn-down sessions leak
    /// nothing.
    pub fn subscription_count(&self) -> usize {
        self.live_subscriptions.load(Ordering::SeqCst)
    }

    /// Number of topics currently holding a broadcast channel.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    // The entry guard is held across the subscribe call, so the new
    // receiver is counted before a concurrent prune can observe the
    // channel.
    fn receiver_for(&self, topic: &str) -> broadcast::Receiver<Message> {
        self.channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.delivery_buffer).0)
            .subscribe()
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        let receivers = match self.channels.get(topic) {
            Some(tx) => tx.send(Message::new(topic, payload)).unwrap_or(0),
            None => 0,
        };
        if receivers == 0 {
            tracing::debug!(topic = %topic, "publish reached no live subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topics: &TopicSet) -> Result<Subscription, SubscribeError> {
        let streams: Vec<_> = topics
            .iter()
            .map(|t| BroadcastStream::new(self.receiver_for(t)))
            .collect();
        let mut merged = futures::stream::select_all(streams);

        let (tx, token, subscription) = delivery_channel(topics.clone(), self.delivery_buffer);
        let counter = Arc::clone(&self.live_subscriptions);
        counter.fetch_add(1, Ordering::SeqCst);

        let channels = Arc::clone(&self.channels);
        let owned_topics: Vec<String> = topics.iter().map(str::to_string).collect();
        let topic_list = topics.to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    item = merged.next() => match item {
                        Some(Ok(msg)) => {
                            if tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                            tracing::warn!(topics = %topic_list, skipped, "slow subscriber dropped messages");
                        }
                        None => break,
                    },
                }
            }
            // Drop our receivers first, then prune channels nobody
            // listens to so the topic map does not grow without bound.
            drop(merged);
            for topic in &owned_topics {
                channels.remove_if(topic, |_, sender| sender.receiver_count() == 0);
            }
            counter.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(topics = %topic_list, "memory subscription released");
        });

        Ok(subscription)
    }
}

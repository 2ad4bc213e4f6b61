use sockbus_core::{Message, TopicSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Live handle to a backend subscription.
///
/// Owns the delivery channel; the adapter's demultiplexing task holds
/// the sending side and exits when the release token fires, closing
/// the channel. Exactly one session owns each subscription.
pub struct Subscription {
    topics: TopicSet,
    rx: mpsc::Receiver<Message>,
    release: ReleaseHandle,
}

impl Subscription {
    /// Receive the next delivered message. Returns `None` once the
    /// subscription has been released and the channel drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// A handle that can release this subscription from elsewhere,
    /// e.g. the session teardown path while the subscription itself
    /// is owned by a drain task.
    pub fn release_handle(&self) -> ReleaseHandle {
        self.release.clone()
    }

    /// Release the backend resource. Idempotent; after this the
    /// channel closes and no further messages are delivered.
    pub fn release(&self) {
        self.release.release();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // A dropped subscription must never leak its backend
        // registration.
        self.release.release();
    }
}

/// Idempotent release trigger for a [`Subscription`].
#[derive(Clone)]
pub struct ReleaseHandle {
    token: CancellationToken,
}

impl ReleaseHandle {
    pub fn release(&self) {
        self.token.cancel();
    }

    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Build the delivery channel for a new subscription. Returns the
/// sender and release token for the adapter's demux task, plus the
/// subscription handed to the caller.
pub(crate) fn delivery_channel(
    topics: TopicSet,
    buffer: usize,
) -> (mpsc::Sender<Message>, CancellationToken, Subscription) {
    let (tx, rx) = mpsc::channel(buffer);
    let token = CancellationToken::new();
    let subscription = Subscription {
        topics,
        rx,
        release: ReleaseHandle {
            token: token.clone(),
        },
    };
    (tx, token, subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn topics(raw: &str) -> TopicSet {
        TopicSet::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn delivers_until_sender_closes() {
        let (tx, _token, mut sub) = delivery_channel(topics("a"), 4);
        tx.send(Message::new("a", Bytes::from_static(b"one")))
            .await
            .unwrap();
        drop(tx);

        let msg = sub.recv().await.unwrap();
        assert_eq!(&msg.payload[..], b"one");
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (_tx, token, sub) = delivery_channel(topics("a"), 4);
        let handle = sub.release_handle();
        assert!(!handle.is_released());

        sub.release();
        sub.release();
        handle.release();

        assert!(handle.is_released());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn drop_releases() {
        let (_tx, token, sub) = delivery_channel(topics("a"), 4);
        let handle = sub.release_handle();
        drop(sub);
        assert!(handle.is_released());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn recv_unblocks_when_demux_task_stops() {
        let (tx, token, mut sub) = delivery_channel(topics("a"), 4);
        let demux = tokio::spawn(async move {
            token.cancelled().await;
            drop(tx);
        });

        sub.release();
        // Channel closes once the demux task observes the release.
        assert!(sub.recv().await.is_none());
        demux.await.unwrap();
    }
}

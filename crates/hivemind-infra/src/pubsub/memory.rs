//! In-process comment hub.
//!
//! Each subscription owns a capacity-1 channel registered under its post id.
//! Publishing never waits: a subscriber that has not drained its previous
//! notification misses the new one.
//!
//! Cancellation is a `watch` signal: sending `true` or dropping the sender
//! cancels. `publish` checks the signal itself, so a cancelled subscriber
//! receives nothing even before its cleanup task has run.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use hivemind_core::domain::Comment;
use hivemind_core::ports::CommentPublisher;

/// Per-subscriber buffer. One pending notification is enough for a live feed.
const SUBSCRIBER_BUFFER: usize = 1;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Comment>,
    cancel: watch::Receiver<bool>,
}

impl Subscriber {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.cancel.has_changed().is_err()
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    posts: HashMap<String, Vec<Subscriber>>,
}

/// Fan-out hub for newly created comments, keyed by post id.
///
/// Cloning is cheap; clones share the same subscriber registry.
#[derive(Clone, Default)]
pub struct CommentHub {
    registry: Arc<Mutex<Registry>>,
}

impl CommentHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Registry updates are single statements; a poisoned lock still holds
        // a consistent map.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Watch `post_id` until `cancel` fires (`true` is sent or the sender is
    /// dropped).
    ///
    /// A cleanup task is spawned that unsubscribes exactly once when `cancel`
    /// fires, after which the returned stream ends. Must be called from
    /// within a Tokio runtime.
    pub fn subscribe(&self, post_id: &str, mut cancel: watch::Receiver<bool>) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);

        let id = {
            let mut registry = self.registry();
            registry.next_id += 1;
            let id = registry.next_id;
            registry
                .posts
                .entry(post_id.to_string())
                .or_default()
                .push(Subscriber {
                    id,
                    sender,
                    cancel: cancel.clone(),
                });
            id
        };
        tracing::debug!(post_id = %post_id, subscriber_id = id, "Subscribed to comments");

        let hub = self.clone();
        let key = post_id.to_string();
        let cleanup = tokio::spawn(async move {
            // Err means the sender is gone, which also cancels.
            let _ = cancel.wait_for(|cancelled| *cancelled).await;
            hub.remove(&key, id);
        });

        Subscription {
            hub: self.clone(),
            post_id: post_id.to_string(),
            id,
            receiver,
            cleanup: Some(cleanup),
        }
    }

    /// Deliver `comment` to every subscriber of `post_id` registered right now.
    ///
    /// Returns the number of subscribers that accepted it.
    pub fn publish(&self, post_id: &str, comment: &Comment) -> usize {
        let mut registry = self.registry();
        let Some(subscribers) = registry.posts.get_mut(post_id) else {
            tracing::debug!(post_id = %post_id, "No subscribers for post");
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|sub| {
            if sub.is_cancelled() {
                tracing::debug!(
                    post_id = %post_id,
                    subscriber_id = sub.id,
                    "Subscriber cancelled, pruned before delivery"
                );
                return false;
            }
            match sub.sender.try_send(comment.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(
                        post_id = %post_id,
                        subscriber_id = sub.id,
                        "Subscriber lagging, notification dropped"
                    );
                    true
                }
                // Receiver is gone; prune it.
                Err(TrySendError::Closed(_)) => false,
            }
        });

        if subscribers.is_empty() {
            registry.posts.remove(post_id);
        }

        tracing::debug!(
            post_id = %post_id,
            comment_id = %comment.id,
            delivered,
            "Comment published"
        );
        delivered
    }

    /// Remove `subscription` from the registry and close its channel.
    ///
    /// Returns `false` if it was already unsubscribed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.remove(&subscription.post_id, subscription.id)
    }

    /// Number of live subscribers watching `post_id`.
    pub fn subscriber_count(&self, post_id: &str) -> usize {
        self.registry().posts.get(post_id).map_or(0, Vec::len)
    }

    fn remove(&self, post_id: &str, id: u64) -> bool {
        let removed = {
            let mut registry = self.registry();
            let Some(subscribers) = registry.posts.get_mut(post_id) else {
                return false;
            };
            let Some(pos) = subscribers.iter().position(|sub| sub.id == id) else {
                return false;
            };
            let removed = subscribers.remove(pos);
            if subscribers.is_empty() {
                registry.posts.remove(post_id);
            }
            removed
        };

        // Dropping the only sender closes the channel.
        drop(removed);
        tracing::debug!(post_id = %post_id, subscriber_id = id, "Unsubscribed from comments");
        true
    }
}

impl CommentPublisher for CommentHub {
    fn publish(&self, post_id: &str, comment: &Comment) -> usize {
        CommentHub::publish(self, post_id, comment)
    }
}

/// A live feed of comments for one post.
///
/// Yields comments until the subscription is cancelled or unsubscribed,
/// then ends. Dropping it unsubscribes immediately.
pub struct Subscription {
    hub: CommentHub,
    post_id: String,
    id: u64,
    receiver: mpsc::Receiver<Comment>,
    cleanup: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next comment, or `None` once the subscription has been closed.
    pub async fn recv(&mut self) -> Option<Comment> {
        self.receiver.recv().await
    }

    /// Wait for the cancellation-bound cleanup task to finish.
    ///
    /// Only returns after the cancellation signal has fired.
    pub async fn closed(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            if let Err(err) = handle.await {
                tracing::error!(
                    post_id = %self.post_id,
                    subscriber_id = self.id,
                    error = %err,
                    "Subscription cleanup task failed"
                );
                self.hub.remove(&self.post_id, self.id);
            }
        }
    }
}

impl Stream for Subscription {
    type Item = Comment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.take() {
            handle.abort();
        }
        self.hub.remove(&self.post_id, self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("post_id", &self.post_id)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;

    fn comment(post_id: &str, content: &str) -> Comment {
        Comment::new(post_id.into(), None, "alice".into(), content.into())
    }

    fn cancel_pair() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_comment() {
        let hub = CommentHub::new();
        let (_cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        let sent = comment("post123", "Test comment");
        assert_eq!(hub.publish("post123", &sent), 1);

        let received = timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for comment");
        assert_eq!(received, Some(sent));
    }

    #[tokio::test]
    async fn test_no_comment_without_publish() {
        let hub = CommentHub::new();
        let (_cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        assert!(timeout(Duration::from_millis(100), sub.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_is_scoped_to_post() {
        let hub = CommentHub::new();
        let (_c1, s1) = cancel_pair();
        let (_c2, s2) = cancel_pair();
        let mut watching = hub.subscribe("post-a", s1);
        let mut other = hub.subscribe("post-b", s2);

        let sent = comment("post-a", "hello");
        assert_eq!(hub.publish("post-a", &sent), 1);

        assert_eq!(watching.recv().await, Some(sent));
        assert!(timeout(Duration::from_millis(50), other.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let hub = CommentHub::new();
        let mut cancels = Vec::new();
        let mut subs = Vec::new();
        for _ in 0..3 {
            let (cancel, signal) = cancel_pair();
            cancels.push(cancel);
            subs.push(hub.subscribe("post123", signal));
        }

        let sent = comment("post123", "everyone");
        assert_eq!(hub.publish("post123", &sent), 3);
        for sub in &mut subs {
            assert_eq!(sub.recv().await.as_ref(), Some(&sent));
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_misses_notification() {
        let hub = CommentHub::new();
        let (_cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        let first = comment("post123", "first");
        let second = comment("post123", "second");
        assert_eq!(hub.publish("post123", &first), 1);
        // Buffer is full; the second one is dropped instead of blocking.
        assert_eq!(hub.publish("post123", &second), 0);

        assert_eq!(sub.recv().await, Some(first));
        assert!(timeout(Duration::from_millis(50), sub.recv()).await.is_err());
        assert_eq!(hub.subscriber_count("post123"), 1);
    }

    #[tokio::test]
    async fn test_cancelled_subscription_receives_nothing() {
        let hub = CommentHub::new();
        let (cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        cancel.send(true).unwrap();
        timeout(Duration::from_secs(1), sub.closed())
            .await
            .expect("cleanup did not run");
        assert_eq!(hub.subscriber_count("post123"), 0);

        assert_eq!(hub.publish("post123", &comment("post123", "late")), 0);
        assert_eq!(sub.recv().await, None);

        // A second publish after close must not panic or block.
        assert_eq!(hub.publish("post123", &comment("post123", "later")), 0);
    }

    #[tokio::test]
    async fn test_publish_right_after_cancel_delivers_nothing() {
        let hub = CommentHub::new();
        let (cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        // No yield in between: the cleanup task has not run yet.
        cancel.send(true).unwrap();
        assert_eq!(hub.publish("post123", &comment("post123", "x")), 0);
        assert_eq!(hub.subscriber_count("post123"), 0);

        timeout(Duration::from_secs(1), sub.closed())
            .await
            .expect("cleanup did not run");
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_signal_cancels() {
        let hub = CommentHub::new();
        let (cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        drop(cancel);
        assert_eq!(hub.publish("post123", &comment("post123", "x")), 0);

        timeout(Duration::from_secs(1), sub.closed())
            .await
            .expect("cleanup did not run");
        assert_eq!(hub.subscriber_count("post123"), 0);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_stream_ends_after_cancellation() {
        let hub = CommentHub::new();
        let (cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        let sent = comment("post123", "before cancel");
        hub.publish("post123", &sent);
        cancel.send(true).unwrap();

        // Buffered notification is still drained, then the stream ends.
        let collected: Vec<_> = timeout(Duration::from_secs(1), (&mut sub).collect::<Vec<_>>())
            .await
            .expect("stream did not end after cancellation");
        assert_eq!(collected, vec![sent]);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let hub = CommentHub::new();
        let (_cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        assert!(hub.unsubscribe(&sub));
        assert!(!hub.unsubscribe(&sub));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_matching_channel() {
        let hub = CommentHub::new();
        let (_c1, s1) = cancel_pair();
        let (_c2, s2) = cancel_pair();
        let leaving = hub.subscribe("post123", s1);
        let mut staying = hub.subscribe("post123", s2);

        hub.unsubscribe(&leaving);
        assert_eq!(hub.subscriber_count("post123"), 1);

        let sent = comment("post123", "still here");
        assert_eq!(hub.publish("post123", &sent), 1);
        assert_eq!(staying.recv().await, Some(sent));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = CommentHub::new();
        let (_cancel, signal) = cancel_pair();
        let sub = hub.subscribe("post123", signal);
        assert_eq!(hub.subscriber_count("post123"), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count("post123"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_publish_races_with_cancellation() {
        let hub = CommentHub::new();
        let mut cancels = Vec::new();
        let mut subs = Vec::new();
        for _ in 0..32 {
            let (cancel, signal) = cancel_pair();
            cancels.push(cancel);
            subs.push(hub.subscribe("post123", signal));
        }

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    hub.publish("post123", &comment("post123", &format!("c{i}")));
                    tokio::task::yield_now().await;
                }
            })
        };

        for cancel in cancels {
            let _ = cancel.send(true);
        }
        for sub in &mut subs {
            timeout(Duration::from_secs(1), sub.closed())
                .await
                .expect("cleanup did not run");
        }

        publisher.await.unwrap();
        assert_eq!(hub.subscriber_count("post123"), 0);
        assert_eq!(hub.publish("post123", &comment("post123", "after")), 0);
    }

    #[tokio::test]
    async fn test_publisher_port() {
        let hub = CommentHub::new();
        let publisher: Arc<dyn CommentPublisher> = Arc::new(hub.clone());
        let (_cancel, signal) = cancel_pair();
        let mut sub = hub.subscribe("post123", signal);

        let sent = comment("post123", "via port");
        assert_eq!(publisher.publish("post123", &sent), 1);
        assert_eq!(sub.recv().await, Some(sent));
    }
}

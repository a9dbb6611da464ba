//! Pub/Sub port - fan-out of newly created comments.

use crate::domain::Comment;

/// Publisher side of the live comment feed.
///
/// Delivery is best-effort: implementations must not block the caller and
/// must not fail because a subscriber is slow or gone.
pub trait CommentPublisher: Send + Sync {
    /// Deliver `comment` to every current watcher of `post_id`.
    /// Returns how many subscribers accepted it.
    fn publish(&self, post_id: &str, comment: &Comment) -> usize;
}

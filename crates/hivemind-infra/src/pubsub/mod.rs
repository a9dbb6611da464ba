//! Live comment notifications.

mod memory;

pub use memory::{CommentHub, Subscription};

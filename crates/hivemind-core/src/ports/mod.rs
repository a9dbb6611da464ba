//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod pubsub;
mod storage;

pub use pubsub::CommentPublisher;
pub use storage::{Page, Storage};

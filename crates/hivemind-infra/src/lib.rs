//! # Hivemind Infrastructure
//!
//! Concrete implementations of the ports defined in `hivemind-core`:
//! storage backends for posts and comment trees, and the hub that pushes
//! new comments to live subscribers.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL storage via SeaORM

pub mod database;
pub mod pubsub;
pub mod storage;

// Re-exports - In-Memory
pub use pubsub::{CommentHub, Subscription};
pub use storage::InMemoryStorage;

#[cfg(feature = "postgres")]
pub use database::PostgresStorage;

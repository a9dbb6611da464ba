use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_id;

/// Post entity - an article that owns a comment thread.
///
/// The thread itself is held by the storage backend; a `Post` value is a
/// snapshot of the record fields only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub comments_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post with a fresh id. Comments start enabled.
    pub fn new(title: String, content: String, author: String) -> Self {
        Self {
            id: generate_id(),
            title,
            content,
            author,
            comments_enabled: true,
            created_at: Utc::now(),
        }
    }
}

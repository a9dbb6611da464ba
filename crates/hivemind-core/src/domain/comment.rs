use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_id;

/// Maximum comment length, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Comment entity - either top-level on a post or a reply to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new comment with a fresh id.
    pub fn new(
        post_id: String,
        parent_id: Option<String>,
        author: String,
        content: String,
    ) -> Self {
        Self {
            id: generate_id(),
            post_id,
            parent_id,
            author,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

//! Data Transfer Objects - request types for the API.

use serde::{Deserialize, Serialize};

/// Request to publish a new post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub author: String,
}

/// Request to enable or disable commenting on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleCommentsRequest {
    pub enabled: bool,
    pub author: String,
}

/// Request to comment on a post, or reply to a comment when `parent_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
    pub author: String,
}

/// `?limit=&offset=` query parameters. Negative values fail to deserialize.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Server-Sent Event name for live comments.
pub const COMMENT_ADDED_EVENT: &str = "commentAdded";

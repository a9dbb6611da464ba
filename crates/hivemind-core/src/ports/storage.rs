use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, Post};
use crate::error::RepoError;

/// Pagination window: `[offset, offset + limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 20;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Slice `items` by this window. An offset past the end yields an empty slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if self.offset >= items.len() {
            return &[];
        }
        let end = self.offset.saturating_add(self.limit).min(items.len());
        &items[self.offset..end]
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// Storage contract for posts and their comment trees.
///
/// Every operation may be called from many tasks at once. Backends must make
/// `create_comment` atomic: a comment is never visible by id without also
/// being linked under its post or parent.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new post. Fails with `RepoError::Duplicate` if the id is taken.
    async fn create_post(&self, post: Post) -> Result<Post, RepoError>;

    /// Snapshot of all posts.
    async fn get_posts(&self) -> Result<Vec<Post>, RepoError>;

    async fn get_post_by_id(&self, id: &str) -> Result<Post, RepoError>;

    /// Set `comments_enabled`. Authorship is checked by the caller, not here.
    async fn toggle_comments(
        &self,
        post_id: &str,
        enabled: bool,
        author: &str,
    ) -> Result<Post, RepoError>;

    /// Register a comment and link it under its parent or post.
    async fn create_comment(&self, comment: Comment) -> Result<Comment, RepoError>;

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment, RepoError>;

    /// Top-level comments of a post, oldest first.
    async fn get_comments_by_post_id(
        &self,
        post_id: &str,
        page: Page,
    ) -> Result<Vec<Comment>, RepoError>;

    /// Direct replies to a comment, oldest first.
    async fn get_replies(&self, parent_id: &str, page: Page) -> Result<Vec<Comment>, RepoError>;
}

//! In-memory storage engine - the default backend when no database is configured.
//!
//! Comments live in an arena; post and reply threads are index lists into it.
//! One async `RwLock` guards the whole arena, so a comment is registered and
//! linked under a single write guard.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use hivemind_core::domain::{Comment, Post};
use hivemind_core::error::RepoError;
use hivemind_core::ports::{Page, Storage};

struct PostNode {
    post: Post,
    /// Top-level comments, in creation order.
    comments: Vec<usize>,
}

struct CommentNode {
    comment: Comment,
    /// Direct replies, in creation order.
    replies: Vec<usize>,
}

#[derive(Default)]
struct Arena {
    posts: HashMap<String, PostNode>,
    post_order: Vec<String>,
    comments: Vec<CommentNode>,
    comment_index: HashMap<String, usize>,
}

impl Arena {
    fn post(&self, id: &str) -> Result<&PostNode, RepoError> {
        self.posts
            .get(id)
            .ok_or_else(|| RepoError::post_not_found(id))
    }

    fn comment(&self, id: &str) -> Option<&CommentNode> {
        self.comment_index.get(id).map(|&idx| &self.comments[idx])
    }

    fn page(&self, thread: &[usize], page: Page) -> Vec<Comment> {
        page.slice(thread)
            .iter()
            .map(|&idx| self.comments[idx].comment.clone())
            .collect()
    }
}

/// Posts and comment trees held in process memory.
///
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryStorage {
    arena: RwLock<Arena>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_post(&self, post: Post) -> Result<Post, RepoError> {
        let mut arena = self.arena.write().await;

        if arena.posts.contains_key(&post.id) {
            return Err(RepoError::Duplicate {
                entity: "post",
                id: post.id,
            });
        }

        arena.post_order.push(post.id.clone());
        arena.posts.insert(
            post.id.clone(),
            PostNode {
                post: post.clone(),
                comments: Vec::new(),
            },
        );
        tracing::debug!(post_id = %post.id, "Post stored");

        Ok(post)
    }

    async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
        let arena = self.arena.read().await;
        Ok(arena
            .post_order
            .iter()
            .filter_map(|id| arena.posts.get(id))
            .map(|node| node.post.clone())
            .collect())
    }

    async fn get_post_by_id(&self, id: &str) -> Result<Post, RepoError> {
        let arena = self.arena.read().await;
        Ok(arena.post(id)?.post.clone())
    }

    async fn toggle_comments(
        &self,
        post_id: &str,
        enabled: bool,
        _author: &str,
    ) -> Result<Post, RepoError> {
        let mut arena = self.arena.write().await;
        let node = arena
            .posts
            .get_mut(post_id)
            .ok_or_else(|| RepoError::post_not_found(post_id))?;

        node.post.comments_enabled = enabled;
        Ok(node.post.clone())
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut arena = self.arena.write().await;

        // Validate everything before touching the arena.
        if !arena.posts.contains_key(&comment.post_id) {
            return Err(RepoError::post_not_found(&comment.post_id));
        }
        if arena.comment_index.contains_key(&comment.id) {
            return Err(RepoError::Duplicate {
                entity: "comment",
                id: comment.id,
            });
        }
        let parent = match &comment.parent_id {
            Some(parent_id) => {
                let idx = arena
                    .comment_index
                    .get(parent_id)
                    .copied()
                    .filter(|&idx| arena.comments[idx].comment.post_id == comment.post_id)
                    .ok_or_else(|| RepoError::parent_not_found(parent_id))?;
                Some(idx)
            }
            None => None,
        };

        let idx = arena.comments.len();
        arena.comments.push(CommentNode {
            comment: comment.clone(),
            replies: Vec::new(),
        });
        arena.comment_index.insert(comment.id.clone(), idx);

        match parent {
            Some(parent_idx) => arena.comments[parent_idx].replies.push(idx),
            None => {
                if let Some(node) = arena.posts.get_mut(&comment.post_id) {
                    node.comments.push(idx);
                }
            }
        }
        tracing::debug!(
            post_id = %comment.post_id,
            comment_id = %comment.id,
            reply = comment.is_reply(),
            "Comment stored"
        );

        Ok(comment)
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment, RepoError> {
        let arena = self.arena.read().await;
        arena
            .comment(id)
            .map(|node| node.comment.clone())
            .ok_or_else(|| RepoError::comment_not_found(id))
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: &str,
        page: Page,
    ) -> Result<Vec<Comment>, RepoError> {
        let arena = self.arena.read().await;
        let node = arena.post(post_id)?;
        Ok(arena.page(&node.comments, page))
    }

    async fn get_replies(&self, parent_id: &str, page: Page) -> Result<Vec<Comment>, RepoError> {
        let arena = self.arena.read().await;
        let node = arena
            .comment(parent_id)
            .ok_or_else(|| RepoError::comment_not_found(parent_id))?;
        Ok(arena.page(&node.replies, page))
    }
}

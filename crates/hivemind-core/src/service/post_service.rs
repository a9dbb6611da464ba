use std::sync::Arc;

use crate::domain::{Comment, MAX_COMMENT_LENGTH, Post};
use crate::error::DomainError;
use crate::ports::{CommentPublisher, Page, Storage};

/// Post and comment use cases.
///
/// Validates against the current post state, writes through [`Storage`],
/// then hands new comments to the [`CommentPublisher`]. No lock is held
/// across the write/publish boundary.
#[derive(Clone)]
pub struct PostService {
    storage: Arc<dyn Storage>,
    publisher: Arc<dyn CommentPublisher>,
}

impl PostService {
    pub fn new(storage: Arc<dyn Storage>, publisher: Arc<dyn CommentPublisher>) -> Self {
        Self { storage, publisher }
    }

    pub async fn create_post(
        &self,
        title: String,
        content: String,
        author: String,
    ) -> Result<Post, DomainError> {
        let post = self
            .storage
            .create_post(Post::new(title, content, author))
            .await?;
        tracing::info!(post_id = %post.id, author = %post.author, "Post created");
        Ok(post)
    }

    pub async fn posts(&self) -> Result<Vec<Post>, DomainError> {
        Ok(self.storage.get_posts().await?)
    }

    pub async fn post(&self, id: &str) -> Result<Post, DomainError> {
        Ok(self.storage.get_post_by_id(id).await?)
    }

    /// Only the post's author may enable or disable commenting.
    pub async fn toggle_comments(
        &self,
        post_id: &str,
        enabled: bool,
        author: &str,
    ) -> Result<Post, DomainError> {
        let post = self.storage.get_post_by_id(post_id).await?;
        if post.author != author {
            tracing::warn!(post_id = %post_id, author = %author, "Rejected comment toggle by non-author");
            return Err(DomainError::validation(
                "only the author of the post can toggle comments",
            ));
        }

        let post = self
            .storage
            .toggle_comments(post_id, enabled, author)
            .await?;
        tracing::info!(post_id = %post_id, enabled, "Comments toggled");
        Ok(post)
    }

    /// Create a comment (or a reply when `parent_id` is set) and notify
    /// watchers of the post. Notification never fails the call.
    pub async fn create_comment(
        &self,
        post_id: &str,
        parent_id: Option<String>,
        content: String,
        author: String,
    ) -> Result<Comment, DomainError> {
        let post = self.storage.get_post_by_id(post_id).await?;
        if !post.comments_enabled {
            return Err(DomainError::validation(
                "commenting is disabled for this post",
            ));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(DomainError::validation("comment too long"));
        }

        let comment = Comment::new(post.id, parent_id, author, content);
        let comment = self.storage.create_comment(comment).await?;

        let delivered = self.publisher.publish(post_id, &comment);
        tracing::debug!(
            post_id = %post_id,
            comment_id = %comment.id,
            delivered,
            "Comment created"
        );

        Ok(comment)
    }

    pub async fn comments(&self, post_id: &str, page: Page) -> Result<Vec<Comment>, DomainError> {
        Ok(self.storage.get_comments_by_post_id(post_id, page).await?)
    }

    pub async fn replies(&self, parent_id: &str, page: Page) -> Result<Vec<Comment>, DomainError> {
        Ok(self.storage.get_replies(parent_id, page).await?)
    }

    pub async fn comment(&self, id: &str) -> Result<Comment, DomainError> {
        Ok(self.storage.get_comment_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RepoError;

    /// Minimal storage double: posts by id, comments in insertion order.
    #[derive(Default)]
    struct FakeStorage {
        posts: Mutex<HashMap<String, Post>>,
        comments: Mutex<Vec<Comment>>,
        fail_writes: bool,
    }

    impl FakeStorage {
        fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Default::default()
            }
        }

        fn with_post(post: Post) -> Self {
            let storage = Self::default();
            storage.posts.lock().unwrap().insert(post.id.clone(), post);
            storage
        }
    }

    #[async_trait]
    impl Storage for FakeStorage {
        async fn create_post(&self, post: Post) -> Result<Post, RepoError> {
            if self.fail_writes {
                return Err(RepoError::Query("db failure".into()));
            }
            self.posts
                .lock()
                .unwrap()
                .insert(post.id.clone(), post.clone());
            Ok(post)
        }

        async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
            Ok(self.posts.lock().unwrap().values().cloned().collect())
        }

        async fn get_post_by_id(&self, id: &str) -> Result<Post, RepoError> {
            self.posts
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| RepoError::post_not_found(id))
        }

        async fn toggle_comments(
            &self,
            post_id: &str,
            enabled: bool,
            _author: &str,
        ) -> Result<Post, RepoError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(post_id)
                .ok_or_else(|| RepoError::post_not_found(post_id))?;
            post.comments_enabled = enabled;
            Ok(post.clone())
        }

        async fn create_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
            if self.fail_writes {
                return Err(RepoError::Query("db failure".into()));
            }
            self.comments.lock().unwrap().push(comment.clone());
            Ok(comment)
        }

        async fn get_comment_by_id(&self, id: &str) -> Result<Comment, RepoError> {
            self.comments
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| RepoError::comment_not_found(id))
        }

        async fn get_comments_by_post_id(
            &self,
            post_id: &str,
            page: Page,
        ) -> Result<Vec<Comment>, RepoError> {
            let top: Vec<_> = self
                .comments
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.post_id == post_id && c.parent_id.is_none())
                .cloned()
                .collect();
            Ok(page.slice(&top).to_vec())
        }

        async fn get_replies(&self, parent_id: &str, page: Page) -> Result<Vec<Comment>, RepoError> {
            let replies: Vec<_> = self
                .comments
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(parent_id))
                .cloned()
                .collect();
            Ok(page.slice(&replies).to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, Comment)>>,
    }

    impl CommentPublisher for RecordingPublisher {
        fn publish(&self, post_id: &str, comment: &Comment) -> usize {
            self.published
                .lock()
                .unwrap()
                .push((post_id.to_string(), comment.clone()));
            1
        }
    }

    fn post_by(author: &str, comments_enabled: bool) -> Post {
        let mut post = Post::new("Test Title".into(), "Test Content".into(), author.into());
        post.comments_enabled = comments_enabled;
        post
    }

    fn service(storage: FakeStorage) -> (PostService, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let service = PostService::new(Arc::new(storage), publisher.clone());
        (service, publisher)
    }

    #[tokio::test]
    async fn test_create_post() {
        let (service, _) = service(FakeStorage::default());
        let post = service
            .create_post("T".into(), "C".into(), "A".into())
            .await
            .unwrap();

        let stored = service.post(&post.id).await.unwrap();
        assert_eq!(stored.title, "T");
        assert_eq!(stored.content, "C");
        assert_eq!(stored.author, "A");
        assert!(stored.comments_enabled);
    }

    #[tokio::test]
    async fn test_create_post_storage_failure() {
        let (service, _) = service(FakeStorage::failing());
        let err = service
            .create_post("T".into(), "C".into(), "alice".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(RepoError::Query(_))));
    }

    #[tokio::test]
    async fn test_post_not_found() {
        let (service, _) = service(FakeStorage::default());
        let err = service.post("missing").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "post", .. }));
    }

    #[tokio::test]
    async fn test_toggle_comments_by_author() {
        let post = post_by("alice", true);
        let id = post.id.clone();
        let (service, _) = service(FakeStorage::with_post(post));

        let updated = service.toggle_comments(&id, false, "alice").await.unwrap();
        assert!(!updated.comments_enabled);
    }

    #[tokio::test]
    async fn test_toggle_comments_rejects_non_author() {
        let post = post_by("alice", true);
        let id = post.id.clone();
        let (service, _) = service(FakeStorage::with_post(post));

        let err = service.toggle_comments(&id, false, "bob").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "only the author of the post can toggle comments"
        );
        assert!(service.post(&id).await.unwrap().comments_enabled);
    }

    #[tokio::test]
    async fn test_toggle_comments_missing_post() {
        let (service, _) = service(FakeStorage::default());
        let err = service
            .toggle_comments("missing", false, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_comment_publishes() {
        let post = post_by("alice", true);
        let id = post.id.clone();
        let (service, publisher) = service(FakeStorage::with_post(post));

        let comment = service
            .create_comment(&id, None, "Test comment".into(), "textik".into())
            .await
            .unwrap();
        assert_eq!(comment.post_id, id);
        assert_eq!(comment.author, "textik");
        assert_eq!(comment.content, "Test comment");

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, id);
        assert_eq!(published[0].1, comment);
    }

    #[tokio::test]
    async fn test_create_comment_when_disabled() {
        let post = post_by("alice", false);
        let id = post.id.clone();
        let (service, publisher) = service(FakeStorage::with_post(post));

        let err = service
            .create_comment(&id, None, "Test comment".into(), "bob".into())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "commenting is disabled for this post");
        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(service.comments(&id, Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_comment_too_long() {
        let post = post_by("alice", true);
        let id = post.id.clone();
        let (service, _) = service(FakeStorage::with_post(post));

        let err = service
            .create_comment(&id, None, "a".repeat(MAX_COMMENT_LENGTH + 1), "bob".into())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "comment too long");

        // Exactly at the limit is fine, counted in characters.
        service
            .create_comment(&id, None, "é".repeat(MAX_COMMENT_LENGTH), "bob".into())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_comment_missing_post() {
        let (service, publisher) = service(FakeStorage::default());
        let err = service
            .create_comment("missing", None, "Test comment".into(), "bob".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "post", .. }));
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_comment_storage_failure_is_not_published() {
        let storage = FakeStorage::failing();
        let post = post_by("alice", true);
        let id = post.id.clone();
        storage.posts.lock().unwrap().insert(id.clone(), post);
        let (service, publisher) = service(storage);

        let err = service
            .create_comment(&id, None, "Test comment".into(), "alice".into())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Query execution failed: db failure");
        assert!(publisher.published.lock().unwrap().is_empty());
    }
}

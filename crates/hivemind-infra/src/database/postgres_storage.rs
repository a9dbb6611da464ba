//! PostgreSQL storage engine.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbConn, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, TransactionTrait,
};

use hivemind_core::domain::{Comment, Post};
use hivemind_core::error::RepoError;
use hivemind_core::ports::{Page, Storage};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};

/// Storage engine over the `posts` and `comments` tables.
///
/// Threads are reconstructed from `parent_id` and ordered by `created_at`,
/// with `id` breaking ties between rows stamped in the same microsecond.
pub struct PostgresStorage {
    db: DbConn,
}

impl PostgresStorage {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> RepoError {
    match e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(e.to_string()),
        _ => RepoError::Query(e.to_string()),
    }
}

fn duplicate(entity: &'static str, id: &str) -> RepoError {
    RepoError::Duplicate {
        entity,
        id: id.to_string(),
    }
}

/// Unique violations still surface here when two writers race past the
/// existence check.
fn insert_err(entity: &'static str, id: &str, e: DbErr) -> RepoError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        duplicate(entity, id)
    } else {
        db_err(e)
    }
}

/// LIMIT/OFFSET as Postgres bigint.
fn bounds(page: Page) -> (u64, u64) {
    let clamp = |n: usize| n.min(i64::MAX as usize) as u64;
    (clamp(page.limit), clamp(page.offset))
}

/// Top-level comments of a post, oldest first.
pub(super) fn top_level_comments(post_id: &str) -> Select<CommentEntity> {
    CommentEntity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .filter(comment::Column::ParentId.is_null())
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
}

/// Direct replies of a comment, oldest first.
pub(super) fn replies_of(parent_id: &str) -> Select<CommentEntity> {
    CommentEntity::find()
        .filter(comment::Column::ParentId.eq(parent_id))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
}

async fn find_post<C: ConnectionTrait>(db: &C, id: &str) -> Result<post::Model, RepoError> {
    PostEntity::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| RepoError::post_not_found(id))
}

async fn find_comment<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<Option<comment::Model>, RepoError> {
    CommentEntity::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(db_err)
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_post(&self, post: Post) -> Result<Post, RepoError> {
        let id = post.id.clone();
        let existing = PostEntity::find_by_id(id.clone())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(duplicate("post", &id));
        }

        let model = post::ActiveModel::from(post)
            .insert(&self.db)
            .await
            .map_err(|e| insert_err("post", &id, e))?;

        tracing::debug!(post_id = %id, "Post stored");
        Ok(model.into())
    }

    async fn get_posts(&self) -> Result<Vec<Post>, RepoError> {
        let posts = PostEntity::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(posts.into_iter().map(Into::into).collect())
    }

    async fn get_post_by_id(&self, id: &str) -> Result<Post, RepoError> {
        Ok(find_post(&self.db, id).await?.into())
    }

    async fn toggle_comments(
        &self,
        post_id: &str,
        enabled: bool,
        _author: &str,
    ) -> Result<Post, RepoError> {
        let mut active = find_post(&self.db, post_id).await?.into_active_model();
        active.comments_enabled = Set(enabled);

        let model = active.update(&self.db).await.map_err(db_err)?;
        Ok(model.into())
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, RepoError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        find_post(&txn, &comment.post_id).await?;
        if let Some(parent_id) = &comment.parent_id {
            let parent = find_comment(&txn, parent_id).await?;
            if !parent.is_some_and(|p| p.post_id == comment.post_id) {
                return Err(RepoError::parent_not_found(parent_id));
            }
        }

        let id = comment.id.clone();
        if find_comment(&txn, &id).await?.is_some() {
            return Err(duplicate("comment", &id));
        }

        let model = comment::ActiveModel::from(comment)
            .insert(&txn)
            .await
            .map_err(|e| insert_err("comment", &id, e))?;
        txn.commit().await.map_err(db_err)?;

        tracing::debug!(post_id = %model.post_id, comment_id = %id, "Comment stored");
        Ok(model.into())
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment, RepoError> {
        find_comment(&self.db, id)
            .await?
            .map(Into::into)
            .ok_or_else(|| RepoError::comment_not_found(id))
    }

    async fn get_comments_by_post_id(
        &self,
        post_id: &str,
        page: Page,
    ) -> Result<Vec<Comment>, RepoError> {
        find_post(&self.db, post_id).await?;

        let (limit, offset) = bounds(page);
        let comments = top_level_comments(post_id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn get_replies(&self, parent_id: &str, page: Page) -> Result<Vec<Comment>, RepoError> {
        if find_comment(&self.db, parent_id).await?.is_none() {
            return Err(RepoError::comment_not_found(parent_id));
        }

        let (limit, offset) = bounds(page);
        let replies = replies_of(parent_id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(replies.into_iter().map(Into::into).collect())
    }
}

//! Comment handlers.

use actix_web::{HttpResponse, web};

use hivemind_core::ports::Page;
use hivemind_shared::dto::{CreateCommentRequest, PageQuery};

use crate::middleware::error::AppResult;
use crate::state::AppState;

fn page(query: &PageQuery) -> Page {
    Page::new(
        query.limit.unwrap_or(Page::DEFAULT_LIMIT),
        query.offset.unwrap_or(0),
    )
}

/// GET /api/posts/{id}/comments?limit=&offset=
pub async fn list(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let comments = state.service.comments(&path, page(&query)).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/posts/{id}/comments
pub async fn create(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let comment = state
        .service
        .create_comment(&path, req.parent_id, req.content, req.author)
        .await?;

    Ok(HttpResponse::Created().json(comment))
}

/// GET /api/comments/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let comment = state.service.comment(&path).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// GET /api/comments/{id}/replies?limit=&offset=
pub async fn replies(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let replies = state.service.replies(&path, page(&query)).await?;
    Ok(HttpResponse::Ok().json(replies))
}

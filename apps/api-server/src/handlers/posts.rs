//! Post handlers.

use actix_web::{HttpResponse, web};

use hivemind_shared::dto::{CreatePostRequest, ToggleCommentsRequest};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.service.posts().await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let post = state
        .service
        .create_post(req.title, req.content, req.author)
        .await?;

    Ok(HttpResponse::Created().json(post))
}

/// GET /api/posts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let post = state.service.post(&path).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/posts/{id}/comments-enabled
pub async fn toggle_comments(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ToggleCommentsRequest>,
) -> AppResult<HttpResponse> {
    let post = state
        .service
        .toggle_comments(&path, body.enabled, &body.author)
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

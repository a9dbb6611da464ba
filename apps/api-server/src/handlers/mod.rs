//! HTTP handlers and route configuration.

mod comments;
mod health;
mod posts;
mod stream;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::list))
                    .route("", web::post().to(posts::create))
                    .route("/{id}", web::get().to(posts::get))
                    .route(
                        "/{id}/comments-enabled",
                        web::put().to(posts::toggle_comments),
                    )
                    .route("/{id}/comments", web::get().to(comments::list))
                    .route("/{id}/comments", web::post().to(comments::create))
                    .route(
                        "/{id}/comments/stream",
                        web::get().to(stream::comment_added),
                    ),
            )
            .service(
                web::scope("/comments")
                    .route("/{id}", web::get().to(comments::get))
                    .route("/{id}/replies", web::get().to(comments::replies)),
            ),
    );
}

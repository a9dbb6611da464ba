//! Live comment feed over Server-Sent Events.

use std::convert::Infallible;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, web};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

use hivemind_core::domain::Comment;
use hivemind_infra::Subscription;
use hivemind_shared::dto::COMMENT_ADDED_EVENT;

use crate::middleware::error::AppResult;
use crate::state::AppState;

fn sse_event(comment: &Comment) -> Option<Bytes> {
    match serde_json::to_string(comment) {
        Ok(json) => Some(Bytes::from(format!(
            "event: {COMMENT_ADDED_EVENT}\nid: {}\ndata: {json}\n\n",
            comment.id
        ))),
        Err(e) => {
            tracing::error!(comment_id = %comment.id, error = %e, "Failed to serialize comment");
            None
        }
    }
}

/// GET /api/posts/{id}/comments/stream
///
/// The subscription lives as long as the connection: when the client goes
/// away actix drops the body stream, which drops `connection` and fires the
/// subscription's cancellation signal.
pub async fn comment_added(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    state.service.post(&post_id).await?;

    let (connection, disconnected) = watch::channel(false);
    let subscription = state.hub.subscribe(&post_id, disconnected);
    tracing::info!(post_id = %post_id, subscriber_id = subscription.id(), "Live comment feed opened");

    let preamble = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b": subscribed\n\n")) });
    let events = stream::unfold(
        (subscription, connection),
        |(mut subscription, connection): (Subscription, watch::Sender<bool>)| async move {
            loop {
                let comment = subscription.recv().await?;
                if let Some(event) = sse_event(&comment) {
                    return Some((Ok::<_, Infallible>(event), (subscription, connection)));
                }
            }
        },
    );

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(preamble.chain(events)))
}

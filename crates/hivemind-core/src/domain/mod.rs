//! Domain entities - the core business objects.

mod comment;
mod id;
mod post;

pub use comment::{Comment, MAX_COMMENT_LENGTH};
pub use id::generate_id;
pub use post::Post;

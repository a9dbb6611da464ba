//! Application services - business rules sequenced over the ports.

mod post_service;

pub use post_service::PostService;

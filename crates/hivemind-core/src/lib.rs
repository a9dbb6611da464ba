//! # Hivemind Core
//!
//! The domain layer of Hivemind: posts, threaded comments, and the rules
//! for creating them. This crate has no infrastructure dependencies; storage
//! backends and the live notification hub live in `hivemind-infra`.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use error::{DomainError, RepoError};
pub use service::PostService;

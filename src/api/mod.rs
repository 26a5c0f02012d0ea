//! HTTP surface over [`crate::service::DownloadService`]
//!
//! Handlers only decode requests and map [`crate::service::ServiceError`]
//! onto status codes; job semantics live in the service.

mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use server::{router, run};

mod auth;
mod client;

pub use auth::AuthToken;
pub use client::{ApiClient, ApiError, TaskListResponse};

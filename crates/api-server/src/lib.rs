#![warn(clippy::unwrap_used)]

pub mod insights_rest;
pub mod rest;
pub mod server;
pub mod swagger;
pub mod usage_rest;

pub use rest::AppState;
pub use server::{router, ApiServer};
pub use swagger::ApiDoc;

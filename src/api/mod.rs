//! HTTP surface: request models, orchestration, router and handlers.

pub mod models;
pub mod routes;
pub mod server;
pub mod service;

pub use server::{build_router, start_server, AppState};
pub use service::Gateway;

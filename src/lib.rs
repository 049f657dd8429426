pub mod app;
pub mod auth;
pub mod authz;
pub mod db;
pub mod docs;
pub mod errors;
pub mod extract;
pub mod jwt;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{build_router, create_app, AppState};

// Docqueue - HTTP front end over a shared work queue

pub mod config;
pub mod models;
pub mod queue;
pub mod routes;
pub mod submissions;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}

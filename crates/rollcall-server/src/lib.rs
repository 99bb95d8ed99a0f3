pub mod client;
pub mod config;
pub mod error;
pub mod event_bridge;
pub mod extract;
pub mod handlers;
pub mod server;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{build_router, start, start_with_repos, AppState, ServerHandle};

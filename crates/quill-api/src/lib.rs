pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;

pub use router::{build_router, ApiDoc};
pub use state::AppState;

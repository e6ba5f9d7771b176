//! HTTP boundary: the merged collection at `/` and a health check.

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

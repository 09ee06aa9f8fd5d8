//! The request pipeline (C6): axum router, auth wiring, and JSON:API routes
//! layered over a [`health_check_backend::interface::CheckBackend`].

pub mod error;
pub mod extract;
pub mod hooks;
pub mod routes;
pub mod state;

pub use hooks::ApiHooks;
pub use routes::build_router;
pub use state::AppState;

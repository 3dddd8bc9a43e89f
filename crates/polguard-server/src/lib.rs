//! polguard server
//!
//! HTTP front-end for the Polish hate-speech and disinformation
//! classifiers: `POST /classify` plus health and Prometheus endpoints.

pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::{create_router, ApiError, ClassifyRequest, ClassifyResponse};
pub use state::AppState;

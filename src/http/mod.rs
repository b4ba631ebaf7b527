//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security (firewall, rate limit) and auth (API key) middleware
//!     → request.rs (client IP, bearer session extraction)
//!     → handlers.rs (JSON API, dashboard)
//!     → response.rs (JSON error bodies)
//! ```

pub mod dashboard;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ClientIp, CurrentSession, JsonBody, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer, InnerState, ServerError};

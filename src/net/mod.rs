//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming connection
//!     → tls.rs (optional TLS, PEM checked at startup)
//!     → connection.rs (in-flight cap, drain on shutdown)
//!     → Hand off to the HTTP layer
//! ```

pub mod connection;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionTracker};
pub use tls::{load_tls_config, TlsError};

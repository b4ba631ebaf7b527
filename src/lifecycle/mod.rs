//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Maintenance (maintenance.rs):
//!     ticker → purge sessions, limiter windows, expired blocks
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accepting → drain in-flight requests → exit
//! ```

pub mod maintenance;
pub mod shutdown;
pub mod signals;

pub use maintenance::Janitor;
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;

//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Service endpoints:   X-API-Key header → api_key.rs → handler
//! Login:               email + password → users.rs (sha256 compare) → sessions.rs (issue token)
//! Session endpoints:   Bearer token → sessions.rs (TTL check) → handler
//! ```

pub mod api_key;
pub mod sessions;
pub mod users;

pub use api_key::ApiKeys;
pub use sessions::{Session, SessionPolicy, SessionStore, SessionSummary};
pub use users::{hash_password, UserStore};

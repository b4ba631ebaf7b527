//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TitanConfig (validated, immutable)
//!     → shared via ArcSwap to request handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the server's inner state
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use validation::MAX_DURATION_SECS;
pub use schema::{
    AdminConfig, ApiKeyConfig, AuthConfig, DetectorConfig, FirewallConfig, GeoConfig, GeoRegion,
    ListenerConfig, ObservabilityConfig, RateLimitConfig, SecurityConfig, TitanConfig, TlsConfig,
    UserConfig,
};

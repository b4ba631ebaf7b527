//! Titan API server library.

pub mod admin;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::schema::TitanConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

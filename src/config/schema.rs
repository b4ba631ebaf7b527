//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the Titan API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TitanConfig {
    /// Service identity reported by the public endpoints.
    pub service: ServiceConfig,

    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// API key protection for service endpoints.
    pub api_key: ApiKeyConfig,

    /// Password login and session settings.
    pub auth: AuthConfig,

    /// Static and dynamic IP blocking.
    pub firewall: FirewallConfig,

    /// Simulated geo-IP restrictions.
    pub geo: GeoConfig,

    /// Keyword threat detector.
    pub detector: DetectorConfig,

    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name reported by `/health`.
    pub name: String,

    /// Product name reported by `/status`.
    pub product: String,

    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Titan".to_string(),
            product: "TitanFusion".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum in-flight requests before shedding with 503.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for in-flight requests to drain.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client IP inside one window.
    pub max_requests: u32,

    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 60,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    /// Require an API key on protected service endpoints.
    pub enabled: bool,

    /// Header carrying the key.
    pub header: String,

    /// Accepted keys.
    pub keys: Vec<String>,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: "X-API-Key".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            keys: vec!["CHANGE_ME".to_string()],
        }
    }
}

/// A login account. Passwords are stored as lowercase hex SHA-256.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub email: String,
    pub password_sha256: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Extend a session's lifetime each time it is used.
    pub sliding_expiration: bool,

    /// Oldest session is evicted once a user exceeds this.
    pub max_sessions_per_user: usize,

    /// Failed logins from one IP before it is blocked.
    pub max_failed_logins: u32,

    /// Window over which failed logins are counted.
    pub failed_login_window_secs: u64,

    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
            sliding_expiration: false,
            max_sessions_per_user: 5,
            max_failed_logins: 5,
            failed_login_window_secs: 300,
            users: vec![UserConfig {
                email: "admin@example.com".to_string(),
                // sha256("123456")
                password_sha256: "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
                    .to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Always-blocked addresses, as single IPs or CIDR ranges.
    pub blocked_ips: Vec<String>,

    /// Block clients that keep tripping the other checks.
    pub auto_block: bool,

    /// Violations inside `violation_window_secs` that trigger an auto block.
    pub violation_threshold: u32,

    pub violation_window_secs: u64,

    /// Duration of an automatic block.
    pub block_secs: u64,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            blocked_ips: Vec::new(),
            auto_block: true,
            violation_threshold: 10,
            violation_window_secs: 60,
            block_secs: 300,
        }
    }
}

/// A static geo table entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoRegion {
    pub cidr: String,
    pub country: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    pub enabled: bool,

    /// Country reported for public addresses outside every region.
    pub default_country: String,

    /// Countries refused with 403.
    pub denied_countries: Vec<String>,

    pub regions: Vec<GeoRegion>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_country: "ZZ".to_string(),
            denied_countries: Vec::new(),
            regions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub enabled: bool,

    /// Case-insensitive substrings that mark a request as hostile.
    pub keywords: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: [
                "<script",
                "javascript:",
                "union select",
                "drop table",
                "' or '1'='1",
                "../",
                "/etc/passwd",
                "cmd.exe",
                "sqlmap",
                "nikto",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Take the client IP from the first X-Forwarded-For hop.
    pub trust_forwarded_for: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 64 * 1024,
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Interval between purges of expired sessions, windows and blocks.
    pub interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: TitanConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.api_key.header, "X-API-Key");
        assert_eq!(config.auth.users.len(), 1);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: TitanConfig = toml::from_str(
            r#"
            [rate_limit]
            max_requests = 5

            [[geo.regions]]
            cidr = "203.0.113.0/24"
            country = "AQ"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.geo.regions.len(), 1);
        assert_eq!(config.geo.default_country, "ZZ");
    }
}

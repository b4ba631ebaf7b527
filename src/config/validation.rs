//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. All problems are
//! collected so an operator sees every error from one run.

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::TitanConfig;
use crate::security::parse_net;

/// Upper bound for every `*_secs` setting: ten years.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &TitanConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
    }

    if config.api_key.enabled {
        if config.api_key.header.trim().is_empty() {
            errors.push(ValidationError::new("api_key.header", "must not be empty"));
        }
        if config.api_key.keys.iter().all(|k| k.is_empty()) {
            errors.push(ValidationError::new("api_key.keys", "at least one non-empty key is required"));
        }
    }

    if config.auth.session_ttl_secs == 0 {
        errors.push(ValidationError::new("auth.session_ttl_secs", "must be greater than 0"));
    }
    if config.auth.max_sessions_per_user == 0 {
        errors.push(ValidationError::new("auth.max_sessions_per_user", "must be greater than 0"));
    }
    if config.auth.max_failed_logins == 0 {
        errors.push(ValidationError::new("auth.max_failed_logins", "must be greater than 0"));
    }
    if config.auth.failed_login_window_secs == 0 {
        errors.push(ValidationError::new("auth.failed_login_window_secs", "must be greater than 0"));
    }
    let mut seen = HashSet::new();
    for (i, user) in config.auth.users.iter().enumerate() {
        let email = user.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            errors.push(ValidationError::new(format!("auth.users[{}].email", i), "not an email address"));
        } else if !seen.insert(email) {
            errors.push(ValidationError::new(format!("auth.users[{}].email", i), "duplicate user"));
        }
        let hash = &user.password_sha256;
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(ValidationError::new(
                format!("auth.users[{}].password_sha256", i),
                "must be 64 hex characters",
            ));
        }
    }

    for (i, entry) in config.firewall.blocked_ips.iter().enumerate() {
        if parse_net(entry).is_none() {
            errors.push(ValidationError::new(
                format!("firewall.blocked_ips[{}]", i),
                format!("'{}' is not an IP address or CIDR range", entry),
            ));
        }
    }
    if config.firewall.auto_block {
        if config.firewall.violation_threshold == 0 {
            errors.push(ValidationError::new("firewall.violation_threshold", "must be greater than 0"));
        }
        if config.firewall.violation_window_secs == 0 {
            errors.push(ValidationError::new("firewall.violation_window_secs", "must be greater than 0"));
        }
    }

    for (i, region) in config.geo.regions.iter().enumerate() {
        if parse_net(&region.cidr).is_none() {
            errors.push(ValidationError::new(
                format!("geo.regions[{}].cidr", i),
                format!("'{}' is not a CIDR range", region.cidr),
            ));
        }
        if region.country.trim().is_empty() {
            errors.push(ValidationError::new(format!("geo.regions[{}].country", i), "must not be empty"));
        }
    }

    if config.detector.keywords.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new("detector.keywords", "keywords must not be empty"));
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new("observability.log_format", "must be 'pretty' or 'json'"));
    }

    if config.maintenance.interval_secs == 0 {
        errors.push(ValidationError::new("maintenance.interval_secs", "must be greater than 0"));
    }

    let durations = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.shutdown_grace_secs", config.timeouts.shutdown_grace_secs),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("auth.session_ttl_secs", config.auth.session_ttl_secs),
        ("auth.failed_login_window_secs", config.auth.failed_login_window_secs),
        ("firewall.violation_window_secs", config.firewall.violation_window_secs),
        ("firewall.block_secs", config.firewall.block_secs),
        ("maintenance.interval_secs", config.maintenance.interval_secs),
    ];
    for (field, secs) in durations {
        if secs > MAX_DURATION_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {} seconds", MAX_DURATION_SECS),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("'{}' is not a socket address", value)));
    }
}

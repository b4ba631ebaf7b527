//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → firewall.rs (blocklist → geo → detector)
//!     → rate_limit.rs (per-IP sliding window)
//!     → Pass to routes
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - Rate limit and detector violations feed one strike counter per IP

pub mod blocklist;
pub mod detector;
pub mod firewall;
pub mod geo;
pub mod headers;
pub mod rate_limit;

use std::net::IpAddr;

use ipnet::IpNet;

/// Parse a CIDR range or a bare address (as a host route).
pub fn parse_net(s: &str) -> Option<IpNet> {
    let s = s.trim();
    if let Ok(net) = s.parse::<IpNet>() {
        return Some(net);
    }
    s.parse::<IpAddr>().ok().map(IpNet::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges_and_hosts() {
        assert_eq!(parse_net("10.0.0.0/8").unwrap().prefix_len(), 8);
        assert_eq!(parse_net(" 192.0.2.1 ").unwrap().prefix_len(), 32);
        assert_eq!(parse_net("2001:db8::1").unwrap().prefix_len(), 128);
        assert!(parse_net("10.0.0.0/33").is_none());
        assert!(parse_net("example.com").is_none());
    }
}

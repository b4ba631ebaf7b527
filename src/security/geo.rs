//! Simulated geo-IP lookup.
//!
//! There is no geo database: addresses resolve through a static region table
//! from config. Non-routable addresses always resolve to [`LOCAL`] and are
//! never denied.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;

use crate::config::GeoConfig;
use crate::security::parse_net;

/// Country code reported for loopback, private and link-local addresses.
pub const LOCAL: &str = "LOCAL";

#[derive(Debug, Clone)]
pub struct GeoResolver {
    enabled: bool,
    /// Sorted by descending prefix length so the first hit is the most specific.
    regions: Vec<(IpNet, String)>,
    default_country: String,
    denied: HashSet<String>,
}

impl GeoResolver {
    pub fn from_config(config: &GeoConfig) -> Self {
        let mut regions: Vec<(IpNet, String)> = config
            .regions
            .iter()
            .filter_map(|r| parse_net(&r.cidr).map(|net| (net, r.country.to_uppercase())))
            .collect();
        regions.sort_by(|a, b| b.0.prefix_len().cmp(&a.0.prefix_len()));

        Self {
            enabled: config.enabled,
            regions,
            default_country: config.default_country.to_uppercase(),
            denied: config.denied_countries.iter().map(|c| c.to_uppercase()).collect(),
        }
    }

    /// Country code for `ip`.
    pub fn lookup(&self, ip: IpAddr) -> &str {
        if is_local(ip) {
            return LOCAL;
        }
        self.regions
            .iter()
            .find(|(net, _)| net.contains(&ip))
            .map(|(_, country)| country.as_str())
            .unwrap_or(self.default_country.as_str())
    }

    /// The country `ip` resolves to, when that country is denied.
    pub fn denied_country(&self, ip: IpAddr) -> Option<String> {
        if !self.enabled || self.denied.is_empty() {
            return None;
        }
        let country = self.lookup(ip);
        if self.denied.contains(country) {
            Some(country.to_string())
        } else {
            None
        }
    }
}

fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_local(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link-local
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

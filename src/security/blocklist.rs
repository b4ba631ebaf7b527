//! IP blocking.
//!
//! Two sources of blocks:
//! - static ranges from `firewall.blocked_ips`, replaced wholesale on reload
//! - dynamic entries added by operators or by the strike counter, optionally
//!   expiring
//!
//! Strikes are violations observed elsewhere in the pipeline (rate limit
//! rejections, detector hits). Reaching the threshold inside the strike
//! window turns into a temporary block. Failed logins run through their own
//! [`StrikeCounter`] with a separate threshold.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ipnet::IpNet;
use serde::Serialize;

/// Why an address is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Matched a configured range.
    Static(IpNet),
    /// Blocked at runtime.
    Dynamic(String),
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Static(net) => write!(f, "static range {}", net),
            BlockReason::Dynamic(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone)]
struct DynamicBlock {
    reason: String,
    blocked_at: DateTime<Utc>,
    until: Option<Instant>,
}

impl DynamicBlock {
    fn is_expired(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| until <= now)
    }
}

/// Snapshot of a dynamic block for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BlockedEntry {
    pub ip: IpAddr,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
    /// Seconds until the block lifts; `None` for permanent blocks.
    pub expires_in_secs: Option<u64>,
}

/// Sliding count of violations per IP.
#[derive(Default)]
pub struct StrikeCounter {
    hits: DashMap<IpAddr, VecDeque<Instant>>,
}

impl StrikeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a violation. Returns true once `threshold` violations fall inside
    /// `window`; the history is cleared at that point.
    pub fn record(&self, ip: IpAddr, threshold: u32, window: Duration, now: Instant) -> bool {
        let mut entry = self.hits.entry(ip).or_default();
        let hits = entry.value_mut();
        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= window {
                hits.pop_front();
            } else {
                break;
            }
        }
        hits.push_back(now);
        if hits.len() >= threshold as usize {
            hits.clear();
            true
        } else {
            false
        }
    }

    pub fn clear(&self, ip: IpAddr) {
        self.hits.remove(&ip);
    }

    /// Forget IPs whose last violation is older than `window`.
    pub fn purge(&self, window: Duration, now: Instant) {
        self.hits.retain(|_, hits| {
            hits.back()
                .map(|last| now.saturating_duration_since(*last) < window)
                .unwrap_or(false)
        });
    }
}

#[derive(Default)]
pub struct IpBlocklist {
    static_nets: RwLock<Vec<IpNet>>,
    dynamic: DashMap<IpAddr, DynamicBlock>,
    strikes: StrikeCounter,
}

impl IpBlocklist {
    pub fn new(static_nets: Vec<IpNet>) -> Self {
        Self {
            static_nets: RwLock::new(static_nets),
            ..Self::default()
        }
    }

    /// Replace the configured ranges, keeping dynamic blocks.
    pub fn replace_static(&self, nets: Vec<IpNet>) {
        match self.static_nets.write() {
            Ok(mut guard) => *guard = nets,
            Err(poisoned) => *poisoned.into_inner() = nets,
        }
    }

    pub fn check(&self, ip: IpAddr) -> Option<BlockReason> {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> Option<BlockReason> {
        let static_hit = {
            let nets = match self.static_nets.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            nets.iter().find(|net| net.contains(&ip)).copied()
        };
        if let Some(net) = static_hit {
            return Some(BlockReason::Static(net));
        }

        match self.dynamic.get(&ip) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => {
                return Some(BlockReason::Dynamic(entry.reason.clone()))
            }
            Some(_) => {}
        }
        // A block placed since the lookup above must survive.
        self.dynamic.remove_if(&ip, |_, block| block.is_expired(now));
        None
    }

    /// Block `ip`, permanently when `duration` is `None`.
    pub fn block(&self, ip: IpAddr, reason: impl Into<String>, duration: Option<Duration>) {
        self.block_at(ip, reason, duration, Instant::now())
    }

    pub fn block_at(&self, ip: IpAddr, reason: impl Into<String>, duration: Option<Duration>, now: Instant) {
        let reason = reason.into();
        tracing::warn!(ip = %ip, reason = %reason, duration = ?duration, "ip blocked");
        self.dynamic.insert(
            ip,
            DynamicBlock {
                reason,
                blocked_at: Utc::now(),
                // Durations past what `Instant` can hold block permanently.
                until: duration.and_then(|d| now.checked_add(d)),
            },
        );
        self.strikes.clear(ip);
    }

    /// Lift a dynamic block. Static ranges can only change through config.
    pub fn unblock(&self, ip: IpAddr) -> bool {
        self.strikes.clear(ip);
        self.dynamic.remove(&ip).is_some()
    }

    /// Count a violation against `ip`. See [`StrikeCounter::record`].
    pub fn record_violation(&self, ip: IpAddr, threshold: u32, window: Duration, now: Instant) -> bool {
        self.strikes.record(ip, threshold, window, now)
    }

    /// Remove expired blocks and stale strike histories.
    pub fn purge_expired(&self, strike_window: Duration, now: Instant) -> usize {
        let before = self.dynamic.len();
        self.dynamic
            .retain(|_, block| !block.is_expired(now));
        self.strikes.purge(strike_window, now);
        before - self.dynamic.len()
    }

    /// Current dynamic blocks, most recent first.
    pub fn list(&self) -> Vec<BlockedEntry> {
        let now = Instant::now();
        let mut entries: Vec<_> = self
            .dynamic
            .iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| BlockedEntry {
                ip: *e.key(),
                reason: e.reason.clone(),
                blocked_at: e.blocked_at,
                expires_in_secs: e.until.map(|until| until.saturating_duration_since(now).as_secs()),
            })
            .collect();
        entries.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at));
        entries
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamic.len()
    }

    pub fn static_count(&self) -> usize {
        match self.static_nets.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::parse_net;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn static_ranges_match_members_only() {
        let list = IpBlocklist::new(vec![
            parse_net("192.0.2.0/24").unwrap(),
            parse_net("2001:db8::1").unwrap(),
        ]);
        assert!(matches!(list.check(ip("192.0.2.77")), Some(BlockReason::Static(_))));
        assert!(list.check(ip("2001:db8::1")).is_some());
        assert!(list.check(ip("2001:db8::2")).is_none());
        assert!(list.check(ip("198.51.100.1")).is_none());
    }

    #[test]
    fn oversized_duration_blocks_permanently() {
        let list = IpBlocklist::default();
        let now = Instant::now();
        list.block_at(ip("10.1.1.2"), "manual", Some(Duration::MAX), now);

        let later = now + Duration::from_secs(10 * 365 * 24 * 3600);
        assert!(list.check_at(ip("10.1.1.2"), later).is_some());
        assert_eq!(list.list()[0].expires_in_secs, None);
    }

    #[test]
    fn expiry_check_keeps_a_fresh_block() {
        let list = IpBlocklist::default();
        let now = Instant::now();
        list.block_at(ip("10.1.1.3"), "old", Some(Duration::from_secs(1)), now);

        let later = now + Duration::from_secs(5);
        list.block_at(ip("10.1.1.3"), "new", None, later);
        assert_eq!(
            list.check_at(ip("10.1.1.3"), later),
            Some(BlockReason::Dynamic("new".into()))
        );
        assert_eq!(list.dynamic_count(), 1);
    }

    #[test]
    fn dynamic_block_expires() {
        let list = IpBlocklist::default();
        let now = Instant::now();
        list.block_at(ip("10.1.1.1"), "manual", Some(Duration::from_secs(10)), now);

        assert_eq!(
            list.check_at(ip("10.1.1.1"), now + Duration::from_secs(5)),
            Some(BlockReason::Dynamic("manual".into()))
        );
        assert_eq!(list.check_at(ip("10.1.1.1"), now + Duration::from_secs(10)), None);
        assert_eq!(list.dynamic_count(), 0);
    }

    #[test]
    fn permanent_block_until_unblocked() {
        let list = IpBlocklist::default();
        list.block(ip("10.1.1.2"), "abuse", None);
        assert!(list.check(ip("10.1.1.2")).is_some());
        assert_eq!(list.list()[0].expires_in_secs, None);

        assert!(list.unblock(ip("10.1.1.2")));
        assert!(!list.unblock(ip("10.1.1.2")));
        assert!(list.check(ip("10.1.1.2")).is_none());
    }

    #[test]
    fn strikes_trip_at_threshold_inside_window() {
        let list = IpBlocklist::default();
        let window = Duration::from_secs(60);
        let start = Instant::now();
        let client = ip("10.1.1.3");

        assert!(!list.record_violation(client, 3, window, start));
        assert!(!list.record_violation(client, 3, window, start + Duration::from_secs(10)));
        // First strike ages out before the third arrives.
        assert!(!list.record_violation(client, 3, window, start + Duration::from_secs(65)));
        assert!(list.record_violation(client, 3, window, start + Duration::from_secs(66)));
        // History resets after tripping.
        assert!(!list.record_violation(client, 3, window, start + Duration::from_secs(67)));
    }

    #[test]
    fn replacing_static_ranges_keeps_dynamic_blocks() {
        let list = IpBlocklist::new(vec![parse_net("10.0.0.0/8").unwrap()]);
        list.block(ip("172.16.0.1"), "manual", None);

        list.replace_static(Vec::new());
        assert!(list.check(ip("10.2.3.4")).is_none());
        assert!(list.check(ip("172.16.0.1")).is_some());
        assert_eq!(list.static_count(), 0);
    }

    #[test]
    fn purge_drops_expired_entries() {
        let list = IpBlocklist::default();
        let now = Instant::now();
        list.block_at(ip("10.1.1.4"), "temp", Some(Duration::from_secs(1)), now);
        list.block_at(ip("10.1.1.5"), "perm", None, now);

        let purged = list.purge_expired(Duration::from_secs(60), now + Duration::from_secs(2));
        assert_eq!(purged, 1);
        assert_eq!(list.dynamic_count(), 1);
    }
}

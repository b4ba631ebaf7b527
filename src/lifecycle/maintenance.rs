//! Periodic cleanup of in-memory state.
//!
//! Expired sessions, idle limiter windows, lapsed blocks and stale strike
//! histories are removed on every tick. Reads already ignore expired data,
//! so the sweep only bounds memory.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::http::server::AppState;
use crate::observability::metrics;

/// What one sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub rate_windows: usize,
    pub blocks: usize,
}

pub struct Janitor {
    state: AppState,
}

impl Janitor {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let secs = self.state.inner.load().config.maintenance.interval_secs.max(1);
        tracing::info!(interval_secs = secs, "Janitor starting");

        let mut ticker = time::interval(Duration::from_secs(secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_at(Instant::now());
                    if report != SweepReport::default() {
                        tracing::debug!(
                            sessions = report.sessions,
                            rate_windows = report.rate_windows,
                            blocks = report.blocks,
                            "Janitor sweep"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Janitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        let inner = self.state.inner.load();
        let config = &inner.config;

        let sessions = self.state.sessions.purge_expired(now);
        let rate_windows = self
            .state
            .limiter
            .purge_idle(Duration::from_secs(config.rate_limit.window_secs), now);
        let blocks = self
            .state
            .blocklist
            .purge_expired(Duration::from_secs(config.firewall.violation_window_secs), now);
        self.state
            .login_failures
            .purge(Duration::from_secs(config.auth.failed_login_window_secs), now);

        if sessions > 0 {
            metrics::record_active_sessions(self.state.sessions.active_count());
        }

        SweepReport {
            sessions,
            rate_windows,
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TitanConfig;

    #[test]
    fn sweep_removes_expired_state() {
        let mut config = TitanConfig::default();
        config.auth.session_ttl_secs = 10;
        config.rate_limit.window_secs = 10;
        let state = AppState::new(config);
        let start = Instant::now();
        let ip = "203.0.113.9".parse().unwrap();

        let policy = state.inner.load().session_policy();
        state.sessions.create_at("admin@example.com", policy, start);
        state.limiter.check_at(ip, 5, Duration::from_secs(10), start);
        state
            .blocklist
            .block_at(ip, "manual", Some(Duration::from_secs(5)), start);

        let janitor = Janitor::new(state.clone());
        assert_eq!(janitor.sweep_at(start), SweepReport::default());

        let report = janitor.sweep_at(start + Duration::from_secs(11));
        assert_eq!(
            report,
            SweepReport {
                sessions: 1,
                rate_windows: 1,
                blocks: 1,
            }
        );
        assert_eq!(state.sessions.active_count(), 0);
        assert_eq!(state.limiter.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let state = AppState::new(TitanConfig::default());
        let shutdown = crate::lifecycle::Shutdown::new();
        let handle = tokio::spawn(Janitor::new(state).run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

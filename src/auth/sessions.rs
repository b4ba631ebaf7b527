//! In-memory session store with TTL expiry.
//!
//! Tokens are random 48-character alphanumeric strings. Expired sessions are
//! removed lazily on lookup and in bulk by the maintenance task.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;

use crate::auth::users::normalize;

const TOKEN_LEN: usize = 48;

/// A live login session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    created: Instant,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires: Option<Instant>,
}

impl Session {
    pub fn expires_in(&self, now: Instant) -> Duration {
        self.expires
            .map(|expires| expires.saturating_duration_since(now))
            .unwrap_or(Duration::MAX)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// Session view for the admin API. The token is masked.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub email: String,
    pub token_prefix: String,
    pub created_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

/// Expiry policy applied to a store.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub sliding: bool,
    pub max_per_user: usize,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `email`.
    pub fn create(&self, email: &str, policy: SessionPolicy) -> Session {
        self.create_at(email, policy, Instant::now())
    }

    pub fn create_at(&self, email: &str, policy: SessionPolicy, now: Instant) -> Session {
        let email = normalize(email);
        self.evict_excess(&email, policy.max_per_user.saturating_sub(1), now);

        let session = Session {
            token: new_token(),
            email,
            created_at: Utc::now(),
            created: now,
            expires: now.checked_add(policy.ttl),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a live session. Expired sessions are removed.
    pub fn validate(&self, token: &str, policy: SessionPolicy) -> Option<Session> {
        self.validate_at(token, policy, Instant::now())
    }

    pub fn validate_at(&self, token: &str, policy: SessionPolicy, now: Instant) -> Option<Session> {
        {
            let mut entry = self.sessions.get_mut(token)?;
            if !entry.is_expired(now) {
                if policy.sliding {
                    entry.expires = now.checked_add(policy.ttl);
                }
                return Some(entry.value().clone());
            }
        }
        self.sessions.remove_if(token, |_, s| s.is_expired(now));
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Revoke every session of `email`. Returns how many were removed.
    pub fn revoke_user(&self, email: &str) -> usize {
        let email = normalize(email);
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.email != email);
        before - self.sessions.len()
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        before - self.sessions.len()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Live sessions, newest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let now = Instant::now();
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| !s.is_expired(now))
            .map(|s| SessionSummary {
                email: s.email.clone(),
                token_prefix: s.token.chars().take(6).collect(),
                created_at: s.created_at,
                expires_in_secs: s.expires_in(now).as_secs(),
            })
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    /// Keep at most `keep` live sessions for `email`, dropping the oldest.
    fn evict_excess(&self, email: &str, keep: usize, now: Instant) {
        let mut owned: Vec<(Instant, String)> = self
            .sessions
            .iter()
            .filter(|s| s.email == email && !s.is_expired(now))
            .map(|s| (s.created, s.token.clone()))
            .collect();
        if owned.len() <= keep {
            return;
        }
        owned.sort_by_key(|(created, _)| *created);
        let excess = owned.len() - keep;
        for (_, token) in owned.into_iter().take(excess) {
            tracing::debug!(email = %email, "evicting oldest session");
            self.sessions.remove(&token);
        }
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

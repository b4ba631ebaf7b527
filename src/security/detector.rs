//! Keyword threat detector.
//!
//! A deliberately simple stand-in for a traffic classifier: each inspector
//! looks at one part of the request and reports the first configured keyword
//! it finds, matching case-insensitively on substrings.
//!
//! # Design Decisions
//! - Inspectors are independent and checked in order: path, query, user agent
//! - The query string is form-decoded before matching so `%27` and `+` don't hide keywords
//! - No regex to guarantee O(n) matching

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};

use crate::config::DetectorConfig;

/// Where a keyword was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Path,
    Query,
    UserAgent,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Location::Path => "path",
            Location::Query => "query",
            Location::UserAgent => "user-agent",
        })
    }
}

/// A detector hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub location: Location,
    pub keyword: String,
}

/// Trait for inspecting one part of a request.
pub trait Inspector: Send + Sync + std::fmt::Debug {
    /// Returns the matched keyword, if any.
    fn inspect(&self, req: &Request<Body>, keywords: &[String]) -> Option<Finding>;
}

#[derive(Debug)]
struct PathInspector;

impl Inspector for PathInspector {
    fn inspect(&self, req: &Request<Body>, keywords: &[String]) -> Option<Finding> {
        let path = percent_encoding::percent_decode_str(req.uri().path())
            .decode_utf8_lossy()
            .to_lowercase();
        first_match(&path, keywords).map(|keyword| Finding {
            location: Location::Path,
            keyword,
        })
    }
}

#[derive(Debug)]
struct QueryInspector;

impl Inspector for QueryInspector {
    fn inspect(&self, req: &Request<Body>, keywords: &[String]) -> Option<Finding> {
        let query = req.uri().query()?;
        let decoded = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
            .to_lowercase();
        first_match(&decoded, keywords).map(|keyword| Finding {
            location: Location::Query,
            keyword,
        })
    }
}

#[derive(Debug)]
struct UserAgentInspector;

impl Inspector for UserAgentInspector {
    fn inspect(&self, req: &Request<Body>, keywords: &[String]) -> Option<Finding> {
        let agent = req.headers().get(header::USER_AGENT)?.to_str().ok()?;
        first_match(&agent.to_lowercase(), keywords).map(|keyword| Finding {
            location: Location::UserAgent,
            keyword,
        })
    }
}

fn first_match(haystack: &str, keywords: &[String]) -> Option<String> {
    keywords.iter().find(|k| haystack.contains(k.as_str())).cloned()
}

#[derive(Debug, Clone)]
pub struct ThreatDetector {
    enabled: bool,
    keywords: Vec<String>,
    inspectors: Vec<Arc<dyn Inspector>>,
}

impl ThreatDetector {
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            enabled: config.enabled,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            inspectors: vec![
                Arc::new(PathInspector),
                Arc::new(QueryInspector),
                Arc::new(UserAgentInspector),
            ],
        }
    }

    /// Scan a request, returning the first finding.
    pub fn scan(&self, req: &Request<Body>) -> Option<Finding> {
        if !self.enabled || self.keywords.is_empty() {
            return None;
        }
        self.inspectors
            .iter()
            .find_map(|inspector| inspector.inspect(req, &self.keywords))
    }
}

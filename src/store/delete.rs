//! Delete policy and per-actor sliding-window rate limiting (§4.F).
//!
//! Ported from `original_source/.../store_ratelimit.py` /
//! `delete_policy.py`: the rate limiter is an in-process sliding window
//! keyed by actor, independent of the HTTP/tower_governor stack the
//! teacher uses elsewhere (out of scope here, see DESIGN.md).

use crate::config::{Config, DeleteMode};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    hits: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window_secs: u64) -> Self {
        Self {
            max_per_window,
            window: Duration::from_secs(window_secs),
            hits: HashMap::new(),
        }
    }

    /// Record an attempt for `actor` and return whether it is within quota.
    /// Always records, even when over quota, so audit-attempt counting
    /// stays accurate.
    pub fn check_and_record(&mut self, actor: &str, now: Instant) -> bool {
        let entry = self.hits.entry(actor.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) <= self.window);
        let within_quota = entry.len() < self.max_per_window as usize;
        entry.push(now);
        within_quota
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Forbidden,
}

/// `soft` is always allowed; `hard` requires both the admin assertion and
/// the `delete_allow_hard` config flag.
pub fn check_policy(config: &Config, mode: DeleteMode, admin_asserted: bool) -> PolicyDecision {
    match mode {
        DeleteMode::Soft => PolicyDecision::Allowed,
        DeleteMode::Hard => {
            if config.delete_allow_hard && admin_asserted {
                PolicyDecision::Allowed
            } else {
                PolicyDecision::Forbidden
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_up_to_max_then_blocks() {
        let mut rl = RateLimiter::new(2, 60);
        let now = Instant::now();
        assert!(rl.check_and_record("actor1", now));
        assert!(rl.check_and_record("actor1", now));
        assert!(!rl.check_and_record("actor1", now));
    }

    #[test]
    fn rate_limiter_is_per_actor() {
        let mut rl = RateLimiter::new(1, 60);
        let now = Instant::now();
        assert!(rl.check_and_record("a", now));
        assert!(rl.check_and_record("b", now));
    }

    #[test]
    fn old_hits_fall_out_of_window() {
        let mut rl = RateLimiter::new(1, 60);
        let t0 = Instant::now();
        assert!(rl.check_and_record("a", t0));
        let t1 = t0 + Duration::from_secs(61);
        assert!(rl.check_and_record("a", t1));
    }

    #[test]
    fn soft_delete_always_allowed() {
        let config = Config::default();
        assert_eq!(
            check_policy(&config, DeleteMode::Soft, false),
            PolicyDecision::Allowed
        );
    }

    #[test]
    fn hard_delete_requires_flag_and_admin_assertion() {
        let mut config = Config::default();
        assert_eq!(
            check_policy(&config, DeleteMode::Hard, true),
            PolicyDecision::Forbidden
        );
        config.delete_allow_hard = true;
        assert_eq!(
            check_policy(&config, DeleteMode::Hard, false),
            PolicyDecision::Forbidden
        );
        assert_eq!(
            check_policy(&config, DeleteMode::Hard, true),
            PolicyDecision::Allowed
        );
    }
}

//! Runtime configuration from environment variables.

use chrono::Duration;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_TTL_MINUTES: i64 = 7 * 24 * 60;
const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;
const DEFAULT_SESSION_COOKIE: &str = "nesk_session";
const DEFAULT_SUPPORT_EMAIL: &str = "onboarding@resend.dev";
const DEFAULT_ACTIVITY_FEED_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskConfig {
    pub bind_addr: String,
    pub session_ttl: Duration,
    pub session_cookie: String,
    pub support_email: String,
    /// Presence enables outbound email.
    pub resend_api_key: Option<String>,
    pub activity_feed_limit: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            resend_api_key: None,
            activity_feed_limit: DEFAULT_ACTIVITY_FEED_LIMIT,
        }
    }
}

impl DeskConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let session_ttl = match lookup("NESK_SESSION_TTL_MINUTES") {
            Some(raw) => parse_ttl(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "NESK_SESSION_TTL_MINUTES is invalid; using default");
                defaults.session_ttl
            }),
            None => defaults.session_ttl,
        };

        let activity_feed_limit = match lookup("NESK_ACTIVITY_FEED_LIMIT") {
            Some(raw) => raw.trim().parse::<usize>().unwrap_or_else(|_| {
                warn!(value = %raw, "NESK_ACTIVITY_FEED_LIMIT is invalid; using default");
                defaults.activity_feed_limit
            }),
            None => defaults.activity_feed_limit,
        };

        let resend_api_key = lookup("RESEND_API_KEY").filter(|k| !k.trim().is_empty());
        if resend_api_key.is_none() {
            warn!("RESEND_API_KEY not set; email notifications are disabled");
        }

        Self {
            bind_addr: lookup("NESK_BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_ttl,
            session_cookie: lookup("NESK_SESSION_COOKIE").unwrap_or(defaults.session_cookie),
            support_email: lookup("SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            resend_api_key,
            activity_feed_limit,
        }
    }
}

/// Whole minutes, from one minute up to a year.
fn parse_ttl(raw: &str) -> Option<Duration> {
    let minutes = raw.trim().parse::<i64>().ok()?;
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        return None;
    }
    Duration::try_minutes(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> DeskConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeskConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), DeskConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("NESK_BIND_ADDR", "127.0.0.1:3000"),
            ("NESK_SESSION_TTL_MINUTES", "60"),
            ("RESEND_API_KEY", "re_123"),
            ("NESK_ACTIVITY_FEED_LIMIT", "10"),
        ]);
        assert_eq!(cfg.bind_addr, "127.0.0.1:3000");
        assert_eq!(cfg.session_ttl, Duration::minutes(60));
        assert_eq!(cfg.resend_api_key.as_deref(), Some("re_123"));
        assert_eq!(cfg.activity_feed_limit, 10);
    }

    #[test]
    fn out_of_range_ttl_falls_back() {
        for raw in ["0", "525601", "1000000000000", "9223372036854775807"] {
            let cfg = config(&[("NESK_SESSION_TTL_MINUTES", raw)]);
            assert_eq!(cfg.session_ttl, DeskConfig::default().session_ttl, "{raw}");
        }

        let cfg = config(&[("NESK_SESSION_TTL_MINUTES", "525600")]);
        assert_eq!(cfg.session_ttl, Duration::days(365));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = config(&[
            ("NESK_SESSION_TTL_MINUTES", "-5"),
            ("NESK_ACTIVITY_FEED_LIMIT", "lots"),
        ]);
        assert_eq!(cfg.session_ttl, DeskConfig::default().session_ttl);
        assert_eq!(cfg.activity_feed_limit, 50);
    }
}

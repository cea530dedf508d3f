use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use live_feed::ReconnectPolicy;
use map_view::Thresholds;

const DEFAULT_FEED_URL: &str = "https://transitapi.me/";

/// Session settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub feed_url: String,
    pub reconnect: ReconnectPolicy,
    pub thresholds: Thresholds,
}

impl Settings {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let policy = defaults.reconnect;
        let limits = defaults.thresholds;

        Self {
            feed_url: setting(&lookup, "FEED_URL", defaults.feed_url),
            reconnect: ReconnectPolicy {
                attempts: setting(&lookup, "RECONNECT_ATTEMPTS", policy.attempts),
                timeout: Duration::from_millis(setting(
                    &lookup,
                    "RECONNECT_TIMEOUT_MS",
                    millis(policy.timeout),
                )),
                delay: Duration::from_millis(setting(
                    &lookup,
                    "RECONNECT_DELAY_MS",
                    millis(policy.delay),
                )),
            },
            thresholds: Thresholds {
                vehicle_min_zoom: setting(&lookup, "VEHICLE_MIN_ZOOM", limits.vehicle_min_zoom),
                stop_min_zoom: setting(&lookup, "STOP_MIN_ZOOM", limits.stop_min_zoom),
                filter_override_limit: setting(
                    &lookup,
                    "FILTER_OVERRIDE_LIMIT",
                    limits.filter_override_limit,
                ),
                fit_limit: setting(&lookup, "FIT_LIMIT", limits.fit_limit),
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            thresholds: Thresholds::default(),
        }
    }
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let Some(value) = lookup(key) else {
        tracing::trace!("{key} not set, using default: {default}");
        return default;
    };
    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %value, "invalid setting, using default: {default}");
        default
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

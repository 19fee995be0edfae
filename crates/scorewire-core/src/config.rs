//! Process configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SCOREWIRE_TIMEOUT_MS` | `15000` | Per-attempt fetch timeout |
//! | `SCOREWIRE_MAX_RETRIES` | `3` | Attempts per fetch, first included |
//! | `SCOREWIRE_JITTER_MIN_MS` | `1000` | Lower bound of pre-attempt jitter |
//! | `SCOREWIRE_JITTER_MAX_MS` | `3000` | Upper bound of pre-attempt jitter |
//! | `SCOREWIRE_CACHE_TTL_SECS` | `1800` | Default cache TTL |

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::ConfigError;
use crate::fetcher::FetchConfig;
use crate::retry::JitterRange;

pub const ENV_TIMEOUT_MS: &str = "SCOREWIRE_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "SCOREWIRE_MAX_RETRIES";
pub const ENV_JITTER_MIN_MS: &str = "SCOREWIRE_JITTER_MIN_MS";
pub const ENV_JITTER_MAX_MS: &str = "SCOREWIRE_JITTER_MAX_MS";
pub const ENV_CACHE_TTL_SECS: &str = "SCOREWIRE_CACHE_TTL_SECS";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub cache_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup. Unset variables keep
    /// their defaults; set but malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(ms) = read_u64(&lookup, ENV_TIMEOUT_MS)? {
            if ms == 0 {
                return Err(ConfigError::ZeroNotAllowed { var: ENV_TIMEOUT_MS });
            }
            settings.fetch.timeout = Duration::from_millis(ms);
        }

        if let Some(max_retries) = read_u64(&lookup, ENV_MAX_RETRIES)? {
            if max_retries == 0 {
                return Err(ConfigError::ZeroNotAllowed {
                    var: ENV_MAX_RETRIES,
                });
            }
            settings.fetch.retry.max_retries = u32::try_from(max_retries).unwrap_or(u32::MAX);
        }

        let default_jitter = settings.fetch.retry.jitter;
        let min_ms = read_u64(&lookup, ENV_JITTER_MIN_MS)?
            .unwrap_or(default_jitter.min.as_millis() as u64);
        let max_ms = read_u64(&lookup, ENV_JITTER_MAX_MS)?
            .unwrap_or(default_jitter.max.as_millis() as u64);
        if min_ms > max_ms {
            return Err(ConfigError::InvertedJitter { min_ms, max_ms });
        }
        settings.fetch.retry.jitter =
            JitterRange::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms));

        if let Some(secs) = read_u64(&lookup, ENV_CACHE_TTL_SECS)? {
            settings.cache_ttl = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}

fn read_u64<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.fetch.timeout, Duration::from_secs(15));
        assert_eq!(settings.cache_ttl, Duration::from_secs(30 * 60));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            (ENV_TIMEOUT_MS, "5000"),
            (ENV_MAX_RETRIES, "5"),
            (ENV_JITTER_MIN_MS, "0"),
            (ENV_JITTER_MAX_MS, "0"),
            (ENV_CACHE_TTL_SECS, "60"),
        ]))
        .expect("valid overrides");

        assert_eq!(settings.fetch.timeout, Duration::from_millis(5000));
        assert_eq!(settings.fetch.retry.max_retries, 5);
        assert!(settings.fetch.retry.jitter.is_disabled());
        assert_eq!(settings.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let error = Settings::from_lookup(lookup_from(&[(ENV_MAX_RETRIES, "three")]))
            .expect_err("not a number");
        assert_eq!(
            error,
            ConfigError::InvalidNumber {
                var: ENV_MAX_RETRIES,
                value: String::from("three"),
            }
        );
    }

    #[test]
    fn zero_retries_and_inverted_jitter_are_rejected() {
        assert!(matches!(
            Settings::from_lookup(lookup_from(&[(ENV_MAX_RETRIES, "0")])),
            Err(ConfigError::ZeroNotAllowed { .. })
        ));
        assert!(matches!(
            Settings::from_lookup(lookup_from(&[
                (ENV_JITTER_MIN_MS, "3000"),
                (ENV_JITTER_MAX_MS, "100"),
            ])),
            Err(ConfigError::InvertedJitter { .. })
        ));
    }
}

//! Environment variable configuration.
//!
//! Check settings can be provided through `SSLWATCH_*` variables. The binary
//! layers them between its CLI flags and the built-in defaults, so everything
//! here is optional and invalid values are dropped rather than treated as
//! fatal. The log file path is read by the binary itself since logging has to
//! be running before these warnings can be reported.

use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via SSLWATCH_* environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub whois_timeout: Option<Duration>,
}

/// Load configuration from environment variables.
///
/// Parses all SSLWATCH_* environment variables and returns a structured
/// configuration. Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an `EnvConfig` from an arbitrary variable lookup.
///
/// Split out from `load_env_config` so tests do not mutate the process
/// environment.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // SSLWATCH_CONCURRENCY - concurrent certificate checks
    if let Some(val) = lookup("SSLWATCH_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=100).contains(&concurrency) => {
                debug!(concurrency, "using SSLWATCH_CONCURRENCY");
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!("Invalid SSLWATCH_CONCURRENCY='{}', must be 1-100", val),
        }
    }

    // SSLWATCH_TIMEOUT - certificate connect and handshake timeout
    if let Some(val) = lookup("SSLWATCH_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(secs) if secs > 0 => {
                debug!(secs, "using SSLWATCH_TIMEOUT");
                env_config.timeout = Some(Duration::from_secs(secs));
            }
            _ => warn!(
                "Invalid SSLWATCH_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    // SSLWATCH_WHOIS_TIMEOUT - whois lookup timeout, 0 disables it
    if let Some(val) = lookup("SSLWATCH_WHOIS_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(secs) => {
                debug!(secs, "using SSLWATCH_WHOIS_TIMEOUT");
                env_config.whois_timeout = Some(Duration::from_secs(secs));
            }
            None => warn!(
                "Invalid SSLWATCH_WHOIS_TIMEOUT='{}', use format like '30s', '2m' or '0'",
                val
            ),
        }
    }

    env_config
}

/// Parse timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }
}

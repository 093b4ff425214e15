use std::time::Duration;

use crate::api::{VeoApi, VeoApiError, DEFAULT_API_BASE};
use crate::messages::DEFAULT_MODEL;
use crate::poll::PollPolicy;

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Veo client configuration loaded from environment variables.
///
/// All fields have defaults suitable for the public Gemini API.
#[derive(Debug, Clone, PartialEq)]
pub struct VeoConfig {
    /// API root (default: the public v1beta endpoint).
    pub api_base: String,
    /// Veo model name.
    pub model: String,
    /// Seconds between status queries (default: `5`).
    pub poll_interval_secs: u64,
    /// Seconds before polling gives up; `0` waits indefinitely (default: `1800`).
    pub poll_max_wait_secs: u64,
    /// Per-request HTTP timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
}

impl Default for VeoConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval_secs: 5,
            poll_max_wait_secs: 1800,
            request_timeout_secs: 60,
        }
    }
}

impl VeoConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                            |
    /// |----------------------------|----------------------------------------------------|
    /// | `VEO_API_BASE`             | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `VEO_MODEL`                | `veo-3.1-fast-generate-preview`                    |
    /// | `VEO_POLL_INTERVAL_SECS`   | `5`                                                |
    /// | `VEO_POLL_MAX_WAIT_SECS`   | `1800`                                             |
    /// | `VEO_REQUEST_TIMEOUT_SECS` | `60`                                               |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base = lookup("VEO_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.api_base);
        let model = lookup("VEO_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.model);

        Ok(Self {
            api_base,
            model,
            poll_interval_secs: parse_secs(
                &lookup,
                "VEO_POLL_INTERVAL_SECS",
                defaults.poll_interval_secs,
            )?,
            poll_max_wait_secs: parse_secs(
                &lookup,
                "VEO_POLL_MAX_WAIT_SECS",
                defaults.poll_max_wait_secs,
            )?,
            request_timeout_secs: parse_secs(
                &lookup,
                "VEO_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
        })
    }

    /// Fixed-interval policy with the configured deadline.
    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.poll_interval_secs.max(1));
        PollPolicy {
            deadline: (self.poll_max_wait_secs > 0)
                .then(|| Duration::from_secs(self.poll_max_wait_secs)),
            ..PollPolicy::unbounded(interval)
        }
    }

    /// HTTP client with the configured timeout.
    pub fn build_api(&self) -> Result<VeoApi, VeoApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .build()?;
        Ok(VeoApi::with_client(client, &self.api_base, &self.model))
    }
}

fn parse_secs<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected: "a non-negative integer",
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = VeoConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, VeoConfig::default());
        assert_eq!(config.poll_policy(), PollPolicy::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = VeoConfig::from_lookup(lookup_from(&[
            ("VEO_MODEL", "veo-3.1-generate-preview"),
            ("VEO_POLL_INTERVAL_SECS", "10"),
            ("VEO_POLL_MAX_WAIT_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.model, "veo-3.1-generate-preview");
        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.deadline, None);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let result = VeoConfig::from_lookup(lookup_from(&[("VEO_POLL_INTERVAL_SECS", "soon")]));
        assert_matches!(
            result,
            Err(ConfigError::Invalid {
                var: "VEO_POLL_INTERVAL_SECS",
                ..
            })
        );
    }
}

use std::str::FromStr;

use crate::app_system::ConfigError;
use crate::domain::LinePolicy;

pub const STORE_BUFFER_VAR: &str = "MERCH_STORE_BUFFER";
pub const MAX_UPDATE_ATTEMPTS_VAR: &str = "MERCH_MAX_UPDATE_ATTEMPTS";
pub const LINE_POLICY_VAR: &str = "MERCH_LINE_POLICY";
pub const RECENT_ORDERS_VAR: &str = "MERCH_RECENT_ORDERS";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

/// Runtime settings for [`OrderSystem`](crate::app_system::OrderSystem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Inbox capacity of each store actor.
    pub store_buffer: usize,
    /// Read-modify-write attempts before a contended update gives up.
    pub max_update_attempts: u32,
    pub line_policy: LinePolicy,
    /// How many orders the admin dashboard lists.
    pub recent_orders_limit: usize,
    pub log_filter: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            store_buffer: 100,
            max_update_attempts: 5,
            line_policy: LinePolicy::default(),
            recent_orders_limit: 5,
            log_filter: "info".to_string(),
        }
    }
}

impl SystemConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            store_buffer: parse(&lookup, STORE_BUFFER_VAR)?.unwrap_or(defaults.store_buffer),
            max_update_attempts: parse(&lookup, MAX_UPDATE_ATTEMPTS_VAR)?
                .unwrap_or(defaults.max_update_attempts),
            line_policy: parse(&lookup, LINE_POLICY_VAR)?.unwrap_or(defaults.line_policy),
            recent_orders_limit: parse(&lookup, RECENT_ORDERS_VAR)?
                .unwrap_or(defaults.recent_orders_limit),
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or(defaults.log_filter),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: STORE_BUFFER_VAR,
                value: self.store_buffer.to_string(),
            });
        }
        if self.max_update_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: MAX_UPDATE_ATTEMPTS_VAR,
                value: self.max_update_attempts.to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SystemConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SystemConfig::default());
        assert_eq!(config.line_policy, LinePolicy::Terminal);
    }

    #[test]
    fn test_overrides() {
        let config = SystemConfig::from_lookup(lookup(&[
            (STORE_BUFFER_VAR, "16"),
            (MAX_UPDATE_ATTEMPTS_VAR, " 9 "),
            (LINE_POLICY_VAR, "Permissive"),
            (RECENT_ORDERS_VAR, "10"),
            (LOG_FILTER_VAR, "merch_orders=debug"),
        ]))
        .unwrap();
        assert_eq!(config.store_buffer, 16);
        assert_eq!(config.max_update_attempts, 9);
        assert_eq!(config.line_policy, LinePolicy::Permissive);
        assert_eq!(config.recent_orders_limit, 10);
        assert_eq!(config.log_filter, "merch_orders=debug");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            SystemConfig::from_lookup(lookup(&[(LINE_POLICY_VAR, "lenient")])),
            Err(ConfigError::InvalidValue {
                key: LINE_POLICY_VAR,
                value: "lenient".into()
            })
        );
        assert!(SystemConfig::from_lookup(lookup(&[(STORE_BUFFER_VAR, "-1")])).is_err());
        assert!(SystemConfig::from_lookup(lookup(&[(MAX_UPDATE_ATTEMPTS_VAR, "0")])).is_err());
    }
}

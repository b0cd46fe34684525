use std::env;

use matcalc_lang::check_max_operations;
use matcalc_repl::ErrorPolicy;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Session settings, read from the environment and then overridden by flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity bound for the operation list. Asked interactively when unset.
    pub max_operations: Option<usize>,
    pub log_level: String,
    pub history: bool,
    pub on_error: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_operations: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            history: true,
            on_error: ErrorPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, which maps variable names to values.
    ///
    /// Invalid values are reported on stderr and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("MATCALC_MAX_OPERATIONS") {
            match value
                .trim()
                .parse::<i64>()
                .map_err(|e| e.to_string())
                .and_then(|n| check_max_operations(n).map_err(|e| e.to_string()))
            {
                Ok(max) => config.max_operations = Some(max),
                Err(err) => eprintln!(
                    "Warning: Invalid MATCALC_MAX_OPERATIONS value '{}' ({}), it will be asked at startup",
                    value, err
                ),
            }
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            config.log_level = log_level;
        } else if let Some(log_level) = lookup("MATCALC_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(history) = lookup("MATCALC_HISTORY") {
            config.history = !matches!(
                history.trim().to_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }

        if let Some(on_error) = lookup("MATCALC_ON_ERROR") {
            match on_error.trim().to_lowercase().parse::<ErrorPolicy>() {
                Ok(policy) => config.on_error = policy,
                Err(_) => eprintln!(
                    "Warning: Invalid MATCALC_ON_ERROR value '{}', using default {}",
                    on_error, config.on_error
                ),
            }
        }

        config
    }
}

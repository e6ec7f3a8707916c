use crate::store::settings::{DeskSettings, SEARCH_DEBOUNCE_RANGE, UNDO_WINDOW_RANGE};
use std::ops::RangeInclusive;
use std::path::PathBuf;

pub const ENV_WORKSPACE: &str = "ROUTINED_WORKSPACE";
pub const ENV_LOG: &str = "ROUTINED_LOG";
pub const ENV_UNDO_WINDOW_SECS: &str = "ROUTINED_UNDO_WINDOW_SECS";
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "ROUTINED_SEARCH_DEBOUNCE_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    NotANumber { var: &'static str, value: String },
    #[error("{var} must be within {min}..={max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Process-level configuration read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
    pub desk: DeskSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: "info".to_string(),
            desk: DeskSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        cfg.workspace = non_empty(ENV_WORKSPACE).map(PathBuf::from);
        if let Some(filter) = non_empty(ENV_LOG) {
            cfg.log_filter = filter;
        }
        if let Some(raw) = non_empty(ENV_UNDO_WINDOW_SECS) {
            cfg.desk.undo_window_seconds = parse_bounded(ENV_UNDO_WINDOW_SECS, &raw, UNDO_WINDOW_RANGE)?;
        }
        if let Some(raw) = non_empty(ENV_SEARCH_DEBOUNCE_MS) {
            cfg.desk.search_debounce_ms = parse_bounded(ENV_SEARCH_DEBOUNCE_MS, &raw, SEARCH_DEBOUNCE_RANGE)?;
        }
        Ok(cfg)
    }
}

fn parse_bounded(
    var: &'static str,
    raw: &str,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let value = match raw.parse::<i64>() {
        Ok(v) if v >= 0 => v,
        _ => {
            return Err(ConfigError::NotANumber {
                var,
                value: raw.to_string(),
            })
        }
    };
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            var,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(value)
}

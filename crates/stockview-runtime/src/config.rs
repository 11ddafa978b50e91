#![forbid(unsafe_code)]

//! Screen configuration.
//!
//! Defaults match the shipped app. A JSON file may override any subset of
//! fields, and `STOCKVIEW_*` environment variables override the file.
//!
//! | variable | field |
//! |---|---|
//! | `STOCKVIEW_TRANSITION_MS` | `card.transition_ms` |
//! | `STOCKVIEW_CARD_WIDTH` | `card.card_width` |
//! | `STOCKVIEW_FETCH_POLICY` | `fetch_policy` (`overlap` or `coalesce`) |
//! | `STOCKVIEW_INITIAL_NUM_TO_RENDER` | `window.initial_num_to_render` |
//! | `STOCKVIEW_MAX_TO_RENDER_PER_BATCH` | `window.max_to_render_per_batch` |
//! | `STOCKVIEW_WINDOW_SIZE` | `window.window_size` |

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use stockview_widgets::{CardConfig, ChipMetrics, WindowConfig};

use crate::error::ConfigError;
use crate::sync::FetchPolicy;

pub const ENV_TRANSITION_MS: &str = "STOCKVIEW_TRANSITION_MS";
pub const ENV_CARD_WIDTH: &str = "STOCKVIEW_CARD_WIDTH";
pub const ENV_FETCH_POLICY: &str = "STOCKVIEW_FETCH_POLICY";
pub const ENV_INITIAL_NUM_TO_RENDER: &str = "STOCKVIEW_INITIAL_NUM_TO_RENDER";
pub const ENV_MAX_TO_RENDER_PER_BATCH: &str = "STOCKVIEW_MAX_TO_RENDER_PER_BATCH";
pub const ENV_WINDOW_SIZE: &str = "STOCKVIEW_WINDOW_SIZE";

/// Everything the inventory screen can be tuned with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub card: CardConfig,
    pub window: WindowConfig,
    pub chips: ChipMetrics,
    pub fetch_policy: FetchPolicy,
    /// Most category heights remembered by the measure cache.
    pub measure_cache_capacity: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            card: CardConfig::default(),
            window: WindowConfig::default(),
            chips: ChipMetrics::default(),
            fetch_policy: FetchPolicy::default(),
            measure_cache_capacity: 256,
        }
    }
}

impl ScreenConfig {
    /// Parse a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the screen cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.card.card_width;
        if !width.is_finite() || width <= 0.0 {
            return Err(out_of_range("card.card_width", width));
        }
        if self.window.window_size == 0 {
            return Err(out_of_range("window.window_size", 0));
        }
        if self.window.max_to_render_per_batch == 0 {
            return Err(out_of_range("window.max_to_render_per_batch", 0));
        }
        Ok(())
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// File (if any), then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| env::var(key).ok())
    }

    /// Apply overrides read through `get`. Stops at the first bad value.
    pub fn apply_env_with<F>(&mut self, mut get: F) -> Result<(), ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(ms) = parse_var::<u64, _>(&mut get, ENV_TRANSITION_MS)? {
            self.card.transition_ms = ms;
        }
        if let Some(width) = parse_var::<f32, _>(&mut get, ENV_CARD_WIDTH)? {
            if !width.is_finite() || width <= 0.0 {
                return Err(invalid(ENV_CARD_WIDTH, width.to_string()));
            }
            self.card.card_width = width;
        }
        if let Some(value) = get(ENV_FETCH_POLICY) {
            self.fetch_policy =
                FetchPolicy::parse(&value).ok_or_else(|| invalid(ENV_FETCH_POLICY, value))?;
        }
        if let Some(n) = parse_var::<usize, _>(&mut get, ENV_INITIAL_NUM_TO_RENDER)? {
            self.window.initial_num_to_render = n;
        }
        if let Some(n) = parse_var::<usize, _>(&mut get, ENV_MAX_TO_RENDER_PER_BATCH)? {
            if n == 0 {
                return Err(invalid(ENV_MAX_TO_RENDER_PER_BATCH, n.to_string()));
            }
            self.window.max_to_render_per_batch = n;
        }
        if let Some(n) = parse_var::<usize, _>(&mut get, ENV_WINDOW_SIZE)? {
            if n == 0 {
                return Err(invalid(ENV_WINDOW_SIZE, n.to_string()));
            }
            self.window.window_size = n;
        }
        Ok(())
    }
}

fn parse_var<T, F>(get: &mut F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: FnMut(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, value)),
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidEnv { key, value }
}

fn out_of_range(field: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
    }
}

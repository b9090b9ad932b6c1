use std::str::FromStr;

use crate::error::ConfigError;
use crate::level::{check_params, DEFAULT_PROBABILITY, MAX_LEVEL};

/// Initial member table capacity.
pub const DEFAULT_TABLE_CAPACITY: usize = 16;

pub const ENV_MAX_LEVEL: &str = "ZSET_MAX_LEVEL";
pub const ENV_PROBABILITY: &str = "ZSET_LEVEL_PROBABILITY";
pub const ENV_SEED: &str = "ZSET_SEED";
pub const ENV_TABLE_CAPACITY: &str = "ZSET_TABLE_CAPACITY";

/// Construction parameters for a [`ZSet`](crate::ZSet).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tallest tower a node may get, `1..=32`.
    pub max_level: usize,
    /// Promotion chance per level.
    pub probability: f64,
    /// Level generator seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub table_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_level: MAX_LEVEL,
            probability: DEFAULT_PROBABILITY,
            seed: None,
            table_capacity: DEFAULT_TABLE_CAPACITY,
        }
    }
}

impl Config {
    /// Defaults overridden by any `ZSET_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_MAX_LEVEL)? {
            config.max_level = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_PROBABILITY)? {
            config.probability = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_SEED)? {
            config.seed = Some(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_TABLE_CAPACITY)? {
            config.table_capacity = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.table_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_params(self.max_level, self.probability)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
    }
}

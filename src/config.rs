use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::repository::DEFAULT_CAPACITY;

const ENV_PREFIX: &str = "RIDEDB_";
const DEFAULT_OUTPUT: &str = "output_file.txt";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `(rideNumber,rideCost,tripDuration)` triplets.
    #[default]
    Triplet,
    /// One JSON value per line.
    Json,
}

/// Runtime settings, read from `RIDEDB_*` environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            output: default_output(),
            format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Config>()?)
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(vars)?)
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_log_level() -> String {
    "info".to_owned()
}

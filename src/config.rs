use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use lock_parser::LOCK_FILE_NAME;

/// What the batch does when one lock file fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    /// Stop at the first failure and print no report
    #[default]
    Abort,
    /// Parse everything, report the successes, list the failures
    Continue,
}

/// Contents of the optional `--config` file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default = "default_lock_file_name")]
    pub lock_file_name: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub pretty: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            lock_file_name: default_lock_file_name(),
            exclude: Vec::new(),
            error_policy: ErrorPolicy::default(),
            concurrency: None,
            pretty: false,
        }
    }
}

fn default_lock_file_name() -> String {
    LOCK_FILE_NAME.to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line; `None`/`false` defers to the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub lock_file_name: Option<String>,
    pub exclude: Vec<String>,
    pub error_policy: Option<ErrorPolicy>,
    pub concurrency: Option<usize>,
    pub pretty: bool,
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub lock_file_name: String,
    pub exclude: Vec<String>,
    pub error_policy: ErrorPolicy,
    pub concurrency: usize,
    pub pretty: bool,
}

impl Config {
    /// Merge CLI overrides over the file config. `exclude` lists are combined.
    pub fn resolve(root: PathBuf, file: UserConfig, cli: Overrides) -> Result<Self, ConfigError> {
        let concurrency = cli
            .concurrency
            .or(file.concurrency)
            .unwrap_or_else(default_concurrency);
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let mut exclude = file.exclude;
        exclude.extend(cli.exclude);

        let config = Self {
            root,
            lock_file_name: cli.lock_file_name.unwrap_or(file.lock_file_name),
            exclude,
            error_policy: cli.error_policy.unwrap_or(file.error_policy),
            concurrency,
            pretty: cli.pretty || file.pretty,
        };
        debug!("config {:?}", config);
        Ok(config)
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

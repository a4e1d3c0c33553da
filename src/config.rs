use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::state::DEFAULT_QUERY_LIMIT;
use crate::view::DEFAULT_PLACEHOLDER;

pub const CONFIG_ENV: &str = "GT_CONFIG";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub taskfile: TaskfileConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_taskfile_names() -> Vec<String> {
    [
        "Taskfile.yml",
        "Taskfile.yaml",
        "taskfile.yml",
        "taskfile.yaml",
        "Taskfile.dist.yml",
        "Taskfile.dist.yaml",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_query_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunnerConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, deserialize_with = "deserialize_runner_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskfileConfig {
    #[serde(default = "default_taskfile_names")]
    pub names: Vec<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub include_internal: bool,
}

impl Default for TaskfileConfig {
    fn default() -> Self {
        Self {
            names: default_taskfile_names(),
            path: None,
            include_internal: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            query_limit: default_query_limit(),
            placeholder: default_placeholder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RunnerArgsConfig {
    Single(String),
    Many(Vec<String>),
}

fn deserialize_runner_args<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let args = RunnerArgsConfig::deserialize(deserializer)?;
    Ok(match args {
        RunnerArgsConfig::Single(value) => {
            value.split_whitespace().map(ToString::to_string).collect()
        }
        RunnerArgsConfig::Many(values) => values,
    })
}

/// Reads the settings file. An explicit path must exist; otherwise the first
/// existing file among `config_candidates` wins and defaults apply when none does.
pub fn load(cwd: &Path, explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => config_candidates(cwd).into_iter().find(|path| path.is_file()),
    };

    let config = match &path {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };
    Ok(LoadedConfig { config, path })
}

fn config_candidates(cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join("gt.toml"), cwd.join(".gt.toml")];
    candidates.extend(dirs::config_dir().map(|root| root.join("gt").join("config.toml")));
    candidates
}

fn read_config(path: &Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

use anyhow::{anyhow, Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// Which policy drives the agent
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Random,
    Heuristic,
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "realm-runner")]
#[command(about = "Realm scenario runner")]
#[command(long_about = "Runs episodes of a registered scenario with a built-in policy.

Each episode is reset with seed + episode index, so a run is reproducible
for a given seed and policy.")]
pub struct Config {
    /// Scenario ID to run (e.g., arena)
    #[arg(long, env = "REALM_ENV_ID", default_value = "arena")]
    pub env_id: String,

    /// Number of episodes to run
    #[arg(long, env = "REALM_EPISODES", default_value = "5")]
    pub episodes: u32,

    /// Step cap per episode, on top of the scenario's own limit
    #[arg(long, env = "REALM_MAX_STEPS", default_value = "1000")]
    pub max_steps: u32,

    /// Base seed for scenario resets and the random policy
    #[arg(long, env = "REALM_SEED", default_value = "0")]
    pub seed: u64,

    /// Policy used to select actions
    #[arg(long, env = "REALM_POLICY", value_enum, default_value = "heuristic")]
    pub policy: PolicyKind,

    /// Log the agent's perception grid at the end of each episode
    #[arg(long, env = "REALM_SHOW_GRID", default_value_t = false)]
    pub show_grid: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "REALM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// TOML file with settings; flags and env vars take precedence
    #[arg(long, env = "REALM_CONFIG")]
    #[serde(skip)]
    pub config: Option<PathBuf>,
}

/// Settings accepted from a `--config` file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub env_id: Option<String>,
    pub episodes: Option<u32>,
    pub max_steps: Option<u32>,
    pub seed: Option<u64>,
    pub policy: Option<PolicyKind>,
    pub show_grid: Option<bool>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| anyhow!("Invalid config file: {}", e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text)
    }
}

impl Config {
    /// Parse the command line, layer in `--config` if given, and validate
    pub fn load() -> Result<Self> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = Self::from_arg_matches(matches)?;
        if let Some(path) = config.config.clone() {
            let file = FileConfig::read(&path)?;
            config.merge_file(file, |id| {
                matches.value_source(id) == Some(ValueSource::DefaultValue)
            });
        }
        config.validate()?;
        Ok(config)
    }

    /// Take values from `file` for every setting `is_default` reports as not
    /// given on the command line or in the environment
    pub fn merge_file(&mut self, file: FileConfig, is_default: impl Fn(&str) -> bool) {
        if let Some(env_id) = file.env_id.filter(|_| is_default("env_id")) {
            self.env_id = env_id;
        }
        if let Some(episodes) = file.episodes.filter(|_| is_default("episodes")) {
            self.episodes = episodes;
        }
        if let Some(max_steps) = file.max_steps.filter(|_| is_default("max_steps")) {
            self.max_steps = max_steps;
        }
        if let Some(seed) = file.seed.filter(|_| is_default("seed")) {
            self.seed = seed;
        }
        if let Some(policy) = file.policy.filter(|_| is_default("policy")) {
            self.policy = policy;
        }
        if let Some(show_grid) = file.show_grid.filter(|_| is_default("show_grid")) {
            self.show_grid = show_grid;
        }
        if let Some(log_level) = file.log_level.filter(|_| is_default("log_level")) {
            self.log_level = log_level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.env_id.is_empty() {
            return Err(anyhow!("env_id cannot be empty"));
        }

        if self.episodes == 0 {
            return Err(anyhow!("episodes must be greater than 0"));
        }

        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be greater than 0"));
        }

        self.level()?;

        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.log_level)
            .map_err(|_| anyhow!("Unknown log level '{}'", self.log_level))
    }

    /// Seed used to reset the given episode
    pub fn episode_seed(&self, episode: u32) -> u64 {
        self.seed.wrapping_add(u64::from(episode))
    }
}

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;

/// Where plans come from and where logs go. Chosen once at start-up.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RunMode {
    /// plan documents on disk, history in the SQLite store
    #[default]
    Live,
    /// built-in plans, history kept in memory for this run only
    LocalFixture,
}

/// Step applied by the rest +/- keys, the original "+30s" button
pub const DEFAULT_REST_STEP_SECS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub run_mode: RunMode,
    pub plans_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub rest_step_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Live,
            plans_dir: None,
            db_path: None,
            rest_step_secs: DEFAULT_REST_STEP_SECS,
        }
    }
}

/// Fully resolved settings handed to the composition root
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub run_mode: RunMode,
    pub plans_dir: PathBuf,
    pub db_path: PathBuf,
    pub rest_step_secs: i64,
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub run_mode: Option<RunMode>,
    pub plans_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl RuntimeSettings {
    pub fn resolve(config: &Config, overrides: Overrides) -> Self {
        let plans_dir = overrides
            .plans_dir
            .or_else(|| config.plans_dir.clone())
            .or_else(AppDirs::plans_dir)
            .unwrap_or_else(|| PathBuf::from("plans"));
        let db_path = overrides
            .db_path
            .or_else(|| config.db_path.clone())
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("liftlog_history.db"));

        Self {
            run_mode: overrides.run_mode.unwrap_or(config.run_mode),
            plans_dir,
            db_path,
            rest_step_secs: config.rest_step_secs,
        }
    }
}

impl From<&RuntimeSettings> for Config {
    fn from(rs: &RuntimeSettings) -> Self {
        Self {
            run_mode: rs.run_mode,
            plans_dir: Some(rs.plans_dir.clone()),
            db_path: Some(rs.db_path.clone()),
            rest_step_secs: rs.rest_step_secs,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "liftlog") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("liftlog_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %self.path.display(), %err, "ignoring malformed config");
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

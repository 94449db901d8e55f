use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::calendar::FirstDayOfWeek;
use crate::history::{Collator, DescendingPolicy};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TREADLOG_CONFIG";
/// Environment variable naming the database file.
pub const DB_ENV: &str = "TREADLOG_DB";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gear: GearConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub first_day_of_week: FirstDayOfWeek,
    #[serde(default)]
    pub descending: DescendingPolicy,
}

impl HistoryConfig {
    #[must_use]
    pub const fn collator(self) -> Collator {
        Collator::new(self.first_day_of_week).with_descending(self.descending)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearConfig {
    /// Lifetime distance given to new gear when none is specified.
    #[serde(default = "default_max_distance")]
    pub default_max_distance: f64,
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            default_max_distance: default_max_distance(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub config: Config,
    pub db_path: PathBuf,
    pub resolved_output: String,
}

/// Location of the user config: `$TREADLOG_CONFIG`, else
/// `<config dir>/treadlog/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("treadlog/config.toml")))
}

/// Load the user config, falling back to defaults when there is none.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(Config::default()),
    }
}

/// # Errors
///
/// Returns an error if `path` exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve config, database path and output mode for one CLI invocation.
///
/// # Errors
///
/// Returns an error if the config cannot be parsed or no database path can
/// be determined.
pub fn resolve_config(cli_db: Option<&Path>, cli_json: bool) -> Result<EffectiveConfig> {
    let config = load_config()?;

    let env_db = env::var_os(DB_ENV)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from);
    let db_path = resolve_db_path(cli_db, env_db, &config)?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, config.output.clone(), env_format);

    Ok(EffectiveConfig {
        config,
        db_path,
        resolved_output,
    })
}

/// Database path precedence: flag, environment, config, platform data dir.
///
/// # Errors
///
/// Returns an error when nothing is configured and the platform has no data
/// directory.
pub fn resolve_db_path(
    cli_db: Option<&Path>,
    env_db: Option<PathBuf>,
    config: &Config,
) -> Result<PathBuf> {
    if let Some(path) = cli_db {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env_db.or_else(|| config.store.path.clone()) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("treadlog/treadlog.sqlite3"))
        .context("no data directory on this platform; pass --db or set TREADLOG_DB")
}

fn resolve_output(
    cli_json: bool,
    config_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = config_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_max_distance() -> f64 {
    500.0
}

//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pm_core::{KpiRule, SlaRule};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub kpi: KpiRule,
    #[serde(default)]
    pub queue_map: QueueMapConfig,
}

/// SLA flag derivation for logs without an `sla_met` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaConfig {
    /// Minutes from creation to resolution. Unset leaves missing flags
    /// unknown, which counts as compliant.
    pub derive_threshold_minutes: Option<u64>,
}

impl SlaConfig {
    pub fn rule(&self) -> Option<SlaRule> {
        self.derive_threshold_minutes.map(SlaRule::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMapConfig {
    pub min_edge_threshold: u64,
}

impl Default for QueueMapConfig {
    fn default() -> Self {
        Self {
            min_edge_threshold: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("pm.db"),
            sla: SlaConfig::default(),
            kpi: KpiRule::default(),
            queue_map: QueueMapConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `<config_dir>/pm/config.toml`, the given
    /// file, then `PM_*` environment variables. Nested keys use `__`, e.g.
    /// `PM_SLA__DERIVE_THRESHOLD_MINUTES=60`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("PM_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for pm.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pm"))
}

/// Returns the platform-specific data directory for pm.
///
/// On Linux: `~/.local/share/pm`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pm"))
}

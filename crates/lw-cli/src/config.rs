//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use lw_core::{DEFAULT_HISTORY_KEY, DEFAULT_LIVE_KEY, DEFAULT_SAMPLE_PERIOD_MS};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Storage key for the session history.
    pub history_key: String,
    /// Storage key for the running clock and open session.
    pub live_key: String,
    /// Sampling period while the clock runs.
    pub sample_period_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("lapwatch.db"),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            live_key: DEFAULT_LIVE_KEY.to_string(),
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
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

        // LW_DATABASE_PATH, LW_SAMPLE_PERIOD_MS, ...
        figment = figment.merge(Env::prefixed("LW_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for lapwatch.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lapwatch"))
}

/// Returns the platform-specific data directory for lapwatch.
///
/// On Linux: `~/.local/share/lapwatch`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("lapwatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_lapwatch() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "lapwatch");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("lapwatch.db"));
        assert_eq!(config.history_key, DEFAULT_HISTORY_KEY);
        assert_eq!(config.sample_period_ms, 10);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/tmp/custom.db\"\nhistory_key = \"h2\"\nsample_period_ms = 50\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.history_key, "h2");
        assert_eq!(config.live_key, DEFAULT_LIVE_KEY);
        assert_eq!(config.sample_period_ms, 50);
    }
}

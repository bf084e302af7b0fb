//! Loader configuration file (JSON).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use matseg_core::LoaderConfig;
use tracing::warn;

pub fn default_config_path() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("matseg")
        .join("config.json")
}

/// Read a config file the user asked for; any failure is an error.
pub fn load_config(path: &Path) -> Result<LoaderConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

/// Read the config at `path` if it exists, otherwise use defaults.
pub fn load_config_or_default(path: &Path) -> LoaderConfig {
    if !path.exists() {
        return LoaderConfig::default();
    }
    load_config(path).unwrap_or_else(|e| {
        warn!("ignoring config: {e:#}");
        LoaderConfig::default()
    })
}

pub fn save_config(path: &Path, config: &LoaderConfig) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matseg_core::{DegenerateRowPolicy, StatisticsSeed};
    use tempfile::TempDir;

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = LoaderConfig {
            statistics_seed: StatisticsSeed::FirstSample,
            degenerate_rows: DegenerateRowPolicy::Reject,
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn lenient_load_falls_back() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(load_config_or_default(&missing), LoaderConfig::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(load_config_or_default(&broken), LoaderConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "statisticsSeed": "firstSample" }"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.statistics_seed, StatisticsSeed::FirstSample);
        assert_eq!(config.degenerate_rows, DegenerateRowPolicy::ZeroFill);
    }
}

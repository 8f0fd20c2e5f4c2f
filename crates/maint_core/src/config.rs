use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Export configuration stored at `~/.maint/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported files are written to. `None` means `~/.maint/exports`.
    pub output_dir: Option<PathBuf>,
    /// Filename prefix used when the caller does not supply one.
    pub default_prefix: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            default_prefix: "Export".into(),
            log_level: "info".into(),
        }
    }
}

impl ExportConfig {
    /// Returns the base config directory: `~/.maint/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".maint"))
    }

    /// Returns the config file path: `~/.maint/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.maint/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Returns the default exports directory: `~/.maint/exports/`
    pub fn exports_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("exports"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        let dirs = [Self::base_dir()?, Self::logs_dir()?, Self::exports_dir()?];
        for dir in &dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Resolved output directory, creating it if needed.
    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => Self::exports_dir()?,
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert!(config.output_dir.is_none());
        assert_eq!(config.default_prefix, "Export");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_creates_default_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        assert!(!path.exists());

        let config = ExportConfig::load_from_path(&path).unwrap();
        assert_eq!(config.default_prefix, "Export");
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let config = ExportConfig {
            output_dir: Some(tmp.path().join("out")),
            default_prefix: "WorkReports".into(),
            log_level: "debug".into(),
        };
        config.save_to_path(&path).unwrap();

        let loaded = ExportConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.output_dir, Some(tmp.path().join("out")));
        assert_eq!(loaded.default_prefix, "WorkReports");
        assert_eq!(loaded.log_level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{ "default_prefix": "Complaints" }"#).unwrap();

        let loaded = ExportConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.default_prefix, "Complaints");
        assert_eq!(loaded.log_level, "info");
        assert!(loaded.output_dir.is_none());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(ExportConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_resolve_output_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("exports").join("today");
        let config = ExportConfig {
            output_dir: Some(out.clone()),
            ..ExportConfig::default()
        };

        let resolved = config.resolve_output_dir().unwrap();
        assert_eq!(resolved, out);
        assert!(out.is_dir());
    }
}

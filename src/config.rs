use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::suggestion::ComposerConfig;

/// Format used when neither the command line nor the config names one
pub const DEFAULT_FORMAT: &str = "standard";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArenaSynergyConfig {
    pub database: Option<String>,
    /// Default format for commands that take `--format`
    pub format: Option<String>,
    #[serde(default)]
    pub engine: ComposerConfig,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("arena-synergy.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".arena-synergy").join("synergy.db")
}

impl ArenaSynergyConfig {
    /// Config written by `init`: database under `base`, default format and
    /// default engine thresholds.
    pub fn initial(base: &Path) -> Self {
        Self {
            database: Some(default_database_path_in(base).to_string_lossy().to_string()),
            format: Some(DEFAULT_FORMAT.to_string()),
            engine: ComposerConfig::default(),
        }
    }

    /// Read the config at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn write(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Thresholds the suggestion composer cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let engine = &self.engine;
        if !(0.0..1.0).contains(&engine.min_confidence) {
            anyhow::bail!("engine.min_confidence must be in [0, 1), got {}", engine.min_confidence);
        }
        if engine.swap_threshold > 0.0 || engine.remove_threshold > 0.0 {
            anyhow::bail!("engine.remove_threshold and engine.swap_threshold must not be positive");
        }
        if engine.add_lookup_limit == 0 || engine.swap_lookup_limit == 0 {
            anyhow::bail!("engine lookup limits must be at least 1");
        }
        if let Some(format) = &self.format {
            if format.trim().is_empty() {
                anyhow::bail!("format must not be empty");
            }
        }
        Ok(())
    }

    /// Database path from the flag, then the config, then the default under
    /// `base`. The parent directory is created if missing.
    pub fn resolve_database(&self, flag: Option<PathBuf>, base: &Path) -> anyhow::Result<PathBuf> {
        let path = flag
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_database_path_in(base));

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(path)
    }

    pub fn resolve_format(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.format.clone())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string())
    }
}

use super::types::{
    CompetencyConfig, DataConfig, OutputConfig, PeriodsConfig, RawCompetencyConfig, RawDataConfig,
    RawOutputConfig, RawPeriodsConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "COMPETENCY_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CompetencyConfig> {
        let mut raw = RawCompetencyConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<RawCompetencyConfig> {
        debug!(path = %path.display(), "Reading config");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "competency").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with COMPETENCY_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".competency/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCompetencyConfig, overlay: RawCompetencyConfig) -> RawCompetencyConfig {
        RawCompetencyConfig {
            data: RawDataConfig {
                path: overlay.data.path.or(base.data.path),
            },
            periods: RawPeriodsConfig {
                quarters_back: overlay.periods.quarters_back.or(base.periods.quarters_back),
                months_back: overlay.periods.months_back.or(base.periods.months_back),
            },
            output: RawOutputConfig {
                format: overlay.output.format.or(base.output.format),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCompetencyConfig) -> CompetencyConfig {
        let data = DataConfig::default();
        let periods = PeriodsConfig::default();

        CompetencyConfig {
            data: DataConfig {
                path: raw.data.path.unwrap_or(data.path),
            },
            periods: PeriodsConfig {
                quarters_back: raw.periods.quarters_back.unwrap_or(periods.quarters_back),
                months_back: raw.periods.months_back.unwrap_or(periods.months_back),
            },
            output: OutputConfig {
                format: raw.output.format.unwrap_or_default(),
            },
        }
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<CompetencyConfig> {
        if path.exists() {
            Ok(Self::finalize(Self::read_raw(path)?))
        } else {
            Ok(CompetencyConfig::default())
        }
    }
}

use competency_core::PeriodLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCompetencyConfig {
    #[serde(default)]
    pub data: RawDataConfig,

    #[serde(default)]
    pub periods: RawPeriodsConfig,

    #[serde(default)]
    pub output: RawOutputConfig,
}

/// Data config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDataConfig {
    /// Dataset file used when `--data` is not given
    pub path: Option<PathBuf>,
}

/// Period look-back as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPeriodsConfig {
    pub quarters_back: Option<usize>,
    pub months_back: Option<usize>,
}

/// Output config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawOutputConfig {
    pub format: Option<OutputFormat>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CompetencyConfig {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub periods: PeriodsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Dataset file used when `--data` is not given
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodsConfig {
    /// Most recent quarters offered as periods
    pub quarters_back: usize,

    /// Most recent months offered as periods
    pub months_back: usize,
}

impl Default for PeriodsConfig {
    fn default() -> Self {
        let limits = PeriodLimits::default();
        Self {
            quarters_back: limits.quarters_back,
            months_back: limits.months_back,
        }
    }
}

impl PeriodsConfig {
    pub fn limits(&self) -> PeriodLimits {
        PeriodLimits {
            quarters_back: self.quarters_back,
            months_back: self.months_back,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// How command results are printed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Default dataset file
pub const DEFAULT_DATA_PATH: &str = "team.json";

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::ThresholdPolicy;
use crate::data::filter::IQR_MULTIPLIER;
use crate::data::model::NumericField;

/// Config file looked up in the working directory when `RUSTY_RENT_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "rusty-rent.json";
/// Names an alternative config file.
pub const CONFIG_ENV: &str = "RUSTY_RENT_CONFIG";
/// Overrides `data_path` from the config file.
pub const DATA_ENV: &str = "RUSTY_RENT_DATA";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Everything the pipeline needs besides the table itself.
///
/// ```json
/// {
///   "data_path": "houses_to_rent_v2.csv",
///   "outliers": { "fields": ["area", "total"], "multiplier": 4.0 },
///   "scatter_policy": "global_mean",
///   "histogram_bins": 30
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub outliers: OutlierConfig,
    /// Threshold policy for colouring the per-listing cost-per-area scatter.
    pub scatter_policy: ThresholdPolicy,
    pub histogram_bins: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("houses_to_rent_v2.csv"),
            outliers: OutlierConfig::default(),
            scatter_policy: ThresholdPolicy::GlobalMean,
            histogram_bins: 30,
        }
    }
}

/// Fields filtered in order, each pass on the previous pass's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub fields: Vec<NumericField>,
    pub multiplier: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            fields: vec![NumericField::Area, NumericField::Total],
            multiplier: IQR_MULTIPLIER,
        }
    }
}

impl DashboardConfig {
    /// Read the config named by `RUSTY_RENT_CONFIG`, else `rusty-rent.json`
    /// if present, else defaults. Then apply `RUSTY_RENT_DATA`.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                log::debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                Self::default()
            }
        };

        if let Some(data) = std::env::var_os(DATA_ENV) {
            config.data_path = PathBuf::from(data);
        }
        config.validate();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate();
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace values the pipeline cannot use with their defaults.
    fn validate(&mut self) {
        if !(self.outliers.multiplier.is_finite() && self.outliers.multiplier >= 0.0) {
            log::warn!(
                "outlier multiplier {} is invalid, using {IQR_MULTIPLIER}",
                self.outliers.multiplier
            );
            self.outliers.multiplier = IQR_MULTIPLIER;
        }
        if self.histogram_bins == 0 {
            log::warn!("histogram_bins must be positive, using 30");
            self.histogram_bins = 30;
        }
    }
}

use serde::{Deserialize, Serialize};
use crate::error::{MrfError, Result};

/// Configuration for dictionary matching
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Number of ROI pixels scored against the dictionary at once (default: 256)
    pub batch_size: usize,
    /// Worker threads used for the best-match search within a batch (default: 1)
    pub num_threads: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            batch_size: 256,
            num_threads: 1,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MrfError::InvalidConfig("batch_size must be positive".to_string()));
        }
        if self.num_threads == 0 {
            return Err(MrfError::InvalidConfig("num_threads must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration for per-ROI summary statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Lower percentile bound for outlier trimming, in [0, 100] (default: 0)
    pub stat_min: f64,
    /// Upper percentile bound for outlier trimming, in [0, 100] (default: 100)
    pub stat_max: f64,
    /// Exchangeable protons per solute molecule; when positive, fs is reported as concentration (mM)
    pub num_exchangeable_protons: Option<f64>,
    /// Collect statistics over the ROI mask instead of over non-zero pixels (default: false)
    pub use_validity_mask: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            stat_min: 0.0,
            stat_max: 100.0,
            num_exchangeable_protons: None,
            use_validity_mask: false,
        }
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<()> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.stat_min) || !in_range(self.stat_max) || self.stat_min > self.stat_max {
            return Err(MrfError::InvalidConfig(format!(
                "percentile bounds must satisfy 0 <= stat_min <= stat_max <= 100, got [{}, {}]",
                self.stat_min, self.stat_max
            )));
        }
        Ok(())
    }
}

/// How composite maps treat pixels claimed by more than one ROI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Sum overlapping values and log a warning
    #[default]
    Sum,
    /// Refuse to composite overlapping ROIs
    Reject,
}

/// Full configuration of one analysis run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub matching: MatchConfig,
    pub stats: StatsConfig,
    pub overlap_policy: OverlapPolicy,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.stats.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.matching.batch_size, 256);
        assert_eq!(config.stats.stat_min, 0.0);
        assert_eq!(config.stats.stat_max, 100.0);
        assert!(config.stats.num_exchangeable_protons.is_none());
        assert_eq!(config.overlap_policy, OverlapPolicy::Sum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = MatchConfig { batch_size: 0, ..MatchConfig::default() };
        assert!(matches!(config.validate(), Err(MrfError::InvalidConfig(_))));
    }

    #[test]
    fn test_inverted_percentiles_rejected() {
        let config = StatsConfig { stat_min: 90.0, stat_max: 10.0, ..StatsConfig::default() };
        assert!(config.validate().is_err());
        let config = StatsConfig { stat_max: 101.0, ..StatsConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"stats": {"stat_min": 5.0}, "overlap_policy": "reject"}"#).unwrap();
        assert_eq!(config.matching.batch_size, 256);
        assert_eq!(config.stats.stat_min, 5.0);
        assert_eq!(config.stats.stat_max, 100.0);
        assert_eq!(config.overlap_policy, OverlapPolicy::Reject);
    }
}

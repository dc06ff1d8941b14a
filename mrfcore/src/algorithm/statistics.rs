use std::collections::{BTreeMap, BTreeSet};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use crate::algorithm::derive::with_concentration;
use crate::config::StatsConfig;
use crate::data::quantity::Quantity;
use crate::data::results::ResultsByRoi;
use crate::error::Result;

/// Mean and standard deviation of one quantity inside one ROI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Number of values left after trimming
    pub count: usize,
}

impl Summary {
    /// Summary of an empty value set: both moments are NaN.
    pub fn empty() -> Self {
        Summary { mean: f64::NAN, std_dev: f64::NAN, count: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Percentile of sorted values with linear interpolation between closest ranks.
///
/// # Arguments
///
/// * `sorted` - values in ascending order, not empty
/// * `p` - percentile in [0, 100]
///
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Mean and standard deviation of the values inside the `[stat_min, stat_max]` percentile range.
///
/// Non-finite values are ignored. Bounds are inclusive.
pub fn trimmed_summary(values: &[f64], stat_min: f64, stat_max: f64) -> Summary {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Summary::empty();
    }
    sorted.sort_by_key(|&v| OrderedFloat(v));

    let lower = percentile(&sorted, stat_min);
    let upper = percentile(&sorted, stat_max);
    let trimmed: Vec<f64> = sorted.into_iter().filter(|&v| v >= lower && v <= upper).collect();
    if trimmed.is_empty() {
        return Summary::empty();
    }

    Summary {
        mean: trimmed.iter().mean(),
        std_dev: trimmed.iter().population_std_dev(),
        count: trimmed.len(),
    }
}

/// Summary statistics of one ROI, one entry per quantity present in its results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub roi: String,
    pub n_pixels: usize,
    pub columns: BTreeMap<Quantity, Summary>,
}

/// Per-ROI summary statistics in display units.
///
/// # Description
///
/// Rows follow ROI order. Values are gathered from non-zero pixels (or from the ROI
/// mask when `use_validity_mask` is set), T2 values are converted to milliseconds and,
/// with a positive proton count, `fs` is reported as `conc` in mM.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsTable {
    rows: Vec<StatisticsRow>,
}

impl StatisticsTable {
    pub fn compute(results: &ResultsByRoi, config: &StatsConfig) -> Result<Self> {
        config.validate()?;
        let mut rows = Vec::with_capacity(results.len());
        for roi in results.iter() {
            let maps = with_concentration(roi.maps(), config.num_exchangeable_protons);
            let mut columns = BTreeMap::new();
            for (q, map) in &maps {
                let values = if config.use_validity_mask {
                    map.gather(roi.mask())?
                } else {
                    map.nonzero_values()
                };
                let scale = q.display_scale();
                let scaled: Vec<f64> = values.iter().map(|v| v * scale).collect();
                let summary = trimmed_summary(&scaled, config.stat_min, config.stat_max);
                if summary.is_empty() {
                    log::debug!("ROI '{}': no values for {}", roi.name(), q);
                }
                columns.insert(*q, summary);
            }
            rows.push(StatisticsRow {
                roi: roi.name().to_string(),
                n_pixels: roi.n_pixels(),
                columns,
            });
        }
        Ok(StatisticsTable { rows })
    }

    pub fn rows(&self) -> &[StatisticsRow] {
        &self.rows
    }

    pub fn get(&self, roi: &str, quantity: Quantity) -> Option<&Summary> {
        self.rows
            .iter()
            .find(|r| r.roi == roi)
            .and_then(|r| r.columns.get(&quantity))
    }

    /// Every quantity with a column in at least one row, in display order.
    pub fn quantities(&self) -> BTreeSet<Quantity> {
        self.rows.iter().flat_map(|r| r.columns.keys().copied()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

use crate::algorithm::matching::{DictionaryMatcher, ProgressObserver};
use crate::algorithm::statistics::StatisticsTable;
use crate::config::AnalysisConfig;
use crate::data::image::{ImageStack, RoiSet};
use crate::data::results::{CompositeMaps, ResultsByRoi};
use crate::dictionary::Dictionary;
use crate::error::Result;

/// Everything one analysis run produces.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub results: ResultsByRoi,
    pub composite: CompositeMaps,
    pub statistics: StatisticsTable,
}

/// Matches all ROIs, then builds composite maps and the statistics table.
///
/// The configuration is validated before any matching starts.
pub fn analyze<P: ProgressObserver + ?Sized>(
    dictionary: &Dictionary,
    stack: &ImageStack,
    rois: &RoiSet,
    config: &AnalysisConfig,
    progress: &mut P,
) -> Result<Analysis> {
    config.validate()?;
    let matcher = DictionaryMatcher::new(dictionary, config.matching.clone())?;
    let results = matcher.match_rois(stack, rois, progress)?;
    let composite = results.composite(config.stats.num_exchangeable_protons, config.overlap_policy)?;
    let statistics = StatisticsTable::compute(&results, &config.stats)?;
    log::info!(
        "analysis finished: {} ROI(s), {} composite map(s)",
        results.len(),
        composite.maps().len()
    );
    Ok(Analysis { results, composite, statistics })
}

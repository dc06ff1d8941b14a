use std::collections::BTreeMap;
use nalgebra::DMatrix;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use crate::algorithm::normalize::normalize_columns;
use crate::config::MatchConfig;
use crate::data::image::{ImageStack, RoiMask, RoiSet};
use crate::data::maps::assemble_maps;
use crate::data::quantity::Quantity;
use crate::data::results::{ResultsByRoi, RoiResult};
use crate::dictionary::Dictionary;
use crate::error::{shape_mismatch, MrfError, Result};

/// Receives progress notifications from a matching run.
///
/// Notifications are a side channel only; every method defaults to doing nothing.
pub trait ProgressObserver {
    /// Called before the ROI at `index` (of `total`) is matched.
    fn roi_started(&mut self, _name: &str, _index: usize, _total: usize) {}
    /// Called after each batch with the number of ROI pixels matched so far.
    fn batch_done(&mut self, _processed: usize, _total: usize) {}
    /// Called once all ROIs are matched.
    fn finished(&mut self) {}
}

/// Discards all progress notifications.
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Forwards progress notifications to the `log` facade.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn roi_started(&mut self, name: &str, index: usize, total: usize) {
        log::info!("Fitting ROI: '{}' ({}/{})...", name, index + 1, total);
    }

    fn batch_done(&mut self, processed: usize, total: usize) {
        log::debug!(
            "Processing batch... {}/{} pixels ({}%)",
            processed,
            total,
            processed * 100 / total.max(1)
        );
    }

    fn finished(&mut self) {
        log::info!("Fitting complete!");
    }
}

/// Best dictionary match of every selected pixel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PixelMatches {
    /// Index of the best-matching dictionary entry
    pub indices: Vec<usize>,
    /// Similarity of the pixel to its best match, in [-1, 1], or NaN for a non-finite trajectory
    pub scores: Vec<f64>,
    /// Dictionary parameter values of the best match
    pub values: BTreeMap<Quantity, Vec<f64>>,
}

impl PixelMatches {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Per-pixel result vectors keyed by quantity, similarity score included as `dp`.
    pub fn columns(&self) -> BTreeMap<Quantity, Vec<f64>> {
        let mut columns = self.values.clone();
        columns.insert(Quantity::Dp, self.scores.clone());
        columns
    }
}

/// Index and value of the largest similarity; ties go to the lowest index.
///
/// The first NaN wins over every number, so a pixel with a NaN in its trajectory
/// reports a NaN score instead of a made-up best match.
#[inline]
fn best_entry(similarities: &[f64]) -> (usize, f64) {
    let Some(&first) = similarities.first() else { return (0, f64::NAN) };
    let mut best = (0, first);
    for (i, &s) in similarities.iter().enumerate().skip(1) {
        if best.1.is_nan() {
            break;
        }
        if s.is_nan() || s > best.1 {
            best = (i, s);
        }
    }
    best
}

/// Dot-product matcher over one dictionary.
///
/// # Description
///
/// The dictionary is normalized once on construction. Pixels are scored in batches of
/// `batch_size`, so at most `batch_size x entries` similarities exist at a time
/// regardless of how many pixels an ROI holds.
///
pub struct DictionaryMatcher<'a> {
    dictionary: &'a Dictionary,
    // entries x frames, so a product with frames x pixels gives one column per pixel
    normalized: DMatrix<f64>,
    config: MatchConfig,
    pool: ThreadPool,
}

impl<'a> DictionaryMatcher<'a> {
    pub fn new(dictionary: &'a Dictionary, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        if dictionary.n_entries() == 0 {
            return Err(MrfError::EmptyDictionary);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .map_err(|e| MrfError::InvalidConfig(format!("thread pool: {}", e)))?;
        Ok(DictionaryMatcher {
            dictionary,
            normalized: dictionary.normalized_signals().transpose(),
            config,
            pool,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        self.dictionary
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Matches raw trajectories given as the columns of a `frames x pixels` matrix.
    pub fn match_pixels<P: ProgressObserver + ?Sized>(&self, data: &DMatrix<f64>, progress: &mut P) -> Result<PixelMatches> {
        if data.nrows() != self.dictionary.n_frames() {
            return Err(shape_mismatch("pixel trajectory length", self.dictionary.n_frames(), data.nrows()));
        }
        let n_pixels = data.ncols();
        let normalized_data = normalize_columns(data);

        let mut indices = Vec::with_capacity(n_pixels);
        let mut scores = Vec::with_capacity(n_pixels);

        for start in (0..n_pixels).step_by(self.config.batch_size) {
            let end = (start + self.config.batch_size).min(n_pixels);
            // column j holds pixel start + j against every dictionary entry
            let similarity = &self.normalized * normalized_data.columns(start, end - start);

            let best: Vec<(usize, f64)> = self.pool.install(|| {
                (0..similarity.ncols())
                    .into_par_iter()
                    .map(|j| best_entry(similarity.column(j).as_slice()))
                    .collect()
            });

            for (index, score) in best {
                indices.push(index);
                scores.push(score);
            }
            progress.batch_done(end, n_pixels);
        }

        let values = self
            .dictionary
            .parameters()
            .iter()
            .map(|(q, v)| (*q, indices.iter().map(|&i| v[i]).collect()))
            .collect();

        Ok(PixelMatches { indices, scores, values })
    }

    /// Matches every pixel of one ROI and assembles the parameter maps.
    ///
    /// An ROI without pixels is not an error: it yields zero-filled maps and a warning.
    pub fn match_roi<P: ProgressObserver + ?Sized>(
        &self,
        name: &str,
        stack: &ImageStack,
        mask: &RoiMask,
        progress: &mut P,
    ) -> Result<RoiResult> {
        if stack.frames() != self.dictionary.n_frames() {
            return Err(shape_mismatch("image stack frames", self.dictionary.n_frames(), stack.frames()));
        }
        let data = stack.select(mask)?;
        if data.ncols() == 0 {
            log::warn!("ROI '{}' selects no pixels, returning empty maps", name);
            return Ok(RoiResult::empty(name, mask.clone()));
        }

        let matches = self.match_pixels(&data, progress)?;
        let maps = assemble_maps(&matches.columns(), mask)?;
        RoiResult::new(name, mask.clone(), maps)
    }

    /// Matches all ROIs in order.
    pub fn match_rois<P: ProgressObserver + ?Sized>(
        &self,
        stack: &ImageStack,
        rois: &RoiSet,
        progress: &mut P,
    ) -> Result<ResultsByRoi> {
        let total = rois.len();
        let mut results = ResultsByRoi::new();
        for (index, (name, mask)) in rois.iter().enumerate() {
            progress.roi_started(name, index, total);
            let result = self.match_roi(name, stack, mask, progress)?;
            log::debug!("ROI '{}': matched {} pixel(s)", name, result.n_pixels());
            results.push(result)?;
        }
        progress.finished();
        Ok(results)
    }
}

/// Matches every ROI of `rois` against `dictionary`.
pub fn mrf_dot_prod<P: ProgressObserver + ?Sized>(
    dictionary: &Dictionary,
    stack: &ImageStack,
    rois: &RoiSet,
    config: &MatchConfig,
    progress: &mut P,
) -> Result<ResultsByRoi> {
    DictionaryMatcher::new(dictionary, config.clone())?.match_rois(stack, rois, progress)
}

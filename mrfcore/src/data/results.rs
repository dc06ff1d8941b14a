use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};
use crate::algorithm::derive::with_concentration;
use crate::config::OverlapPolicy;
use crate::data::image::RoiMask;
use crate::data::maps::ParameterMap;
use crate::data::quantity::Quantity;
use crate::error::{shape_mismatch, MrfError, Result};

/// Parameter maps matched for one ROI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoiResultRepr")]
pub struct RoiResult {
    name: String,
    mask: RoiMask,
    maps: BTreeMap<Quantity, ParameterMap>,
}

#[derive(Deserialize)]
struct RoiResultRepr {
    name: String,
    mask: RoiMask,
    maps: BTreeMap<Quantity, ParameterMap>,
}

impl TryFrom<RoiResultRepr> for RoiResult {
    type Error = MrfError;

    fn try_from(repr: RoiResultRepr) -> Result<Self> {
        RoiResult::new(repr.name, repr.mask, repr.maps)
    }
}

impl RoiResult {
    pub fn new(name: impl Into<String>, mask: RoiMask, maps: BTreeMap<Quantity, ParameterMap>) -> Result<Self> {
        if let Some(map) = maps.values().find(|m| m.shape() != mask.shape()) {
            return Err(shape_mismatch("ROI result map", mask.shape(), map.shape()));
        }
        Ok(RoiResult { name: name.into(), mask, maps })
    }

    /// Zero-filled maps for every matched quantity, used when the mask selects nothing.
    pub fn empty(name: impl Into<String>, mask: RoiMask) -> Self {
        let (rows, cols) = mask.shape();
        let maps = Quantity::MATCHED
            .iter()
            .map(|q| (*q, ParameterMap::zeros(rows, cols)))
            .collect();
        RoiResult { name: name.into(), mask, maps }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ROI mask, which is also the validity mask of every map in this result.
    pub fn mask(&self) -> &RoiMask {
        &self.mask
    }

    pub fn n_pixels(&self) -> usize {
        self.mask.count()
    }

    pub fn map(&self, quantity: Quantity) -> Option<&ParameterMap> {
        self.maps.get(&quantity)
    }

    pub fn maps(&self) -> &BTreeMap<Quantity, ParameterMap> {
        &self.maps
    }
}

/// Results of one matching run, ROI by ROI in the order they were matched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResultsByRoiRepr")]
pub struct ResultsByRoi {
    rois: Vec<RoiResult>,
}

#[derive(Deserialize)]
struct ResultsByRoiRepr {
    rois: Vec<RoiResult>,
}

impl TryFrom<ResultsByRoiRepr> for ResultsByRoi {
    type Error = MrfError;

    fn try_from(repr: ResultsByRoiRepr) -> Result<Self> {
        let mut results = ResultsByRoi::new();
        for roi in repr.rois {
            results.push(roi)?;
        }
        Ok(results)
    }
}

impl ResultsByRoi {
    pub fn new() -> Self {
        ResultsByRoi { rois: Vec::new() }
    }

    pub fn push(&mut self, result: RoiResult) -> Result<()> {
        if self.get(result.name()).is_some() {
            return Err(MrfError::DuplicateRoi(result.name));
        }
        if let Some(shape) = self.shape() {
            if shape != result.mask.shape() {
                return Err(shape_mismatch("ROI results", shape, result.mask.shape()));
            }
        }
        self.rois.push(result);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RoiResult> {
        self.rois.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoiResult> {
        self.rois.iter()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn shape(&self) -> Option<(usize, usize)> {
        self.rois.first().map(|r| r.mask.shape())
    }

    /// Every quantity present in at least one ROI.
    pub fn quantities(&self) -> BTreeSet<Quantity> {
        self.rois.iter().flat_map(|r| r.maps.keys().copied()).collect()
    }

    /// Union of all ROI masks.
    pub fn coverage(&self) -> Result<Option<RoiMask>> {
        let mut masks = self.rois.iter().map(|r| &r.mask);
        let Some(first) = masks.next() else { return Ok(None) };
        masks
            .try_fold(first.clone(), |acc, mask| acc.union(mask))
            .map(Some)
    }

    /// Pixels claimed by more than one ROI.
    pub fn overlap_count(&self) -> usize {
        let Some((rows, cols)) = self.shape() else { return 0 };
        let mut claims = vec![0u32; rows * cols];
        for roi in &self.rois {
            for (i, &b) in roi.mask.data().iter().enumerate() {
                if b {
                    claims[i] += 1;
                }
            }
        }
        claims.iter().filter(|&&n| n > 1).count()
    }

    /// Merges the per-ROI maps into one map per quantity by elementwise summation.
    ///
    /// Summation reconstructs the full image only when ROIs are disjoint; overlapping
    /// pixels are either summed with a warning or rejected, depending on `policy`.
    /// With a positive proton count, `fs` is replaced by `conc`.
    pub fn composite(&self, num_exchangeable_protons: Option<f64>, policy: OverlapPolicy) -> Result<CompositeMaps> {
        let Some((rows, cols)) = self.shape() else {
            log::warn!("no ROI results to composite");
            return Ok(CompositeMaps::default());
        };

        let overlap = self.overlap_count();
        if overlap > 0 {
            match policy {
                OverlapPolicy::Reject => return Err(MrfError::OverlappingRois(overlap)),
                OverlapPolicy::Sum => log::warn!("ROI masks overlap at {} pixel(s), composite values are summed", overlap),
            }
        }

        let mut summed: BTreeMap<Quantity, ParameterMap> = self
            .quantities()
            .into_iter()
            .map(|q| (q, ParameterMap::zeros(rows, cols)))
            .collect();
        for roi in &self.rois {
            for (q, map) in &roi.maps {
                if let Some(total) = summed.get_mut(q) {
                    total.accumulate(map)?;
                }
            }
        }

        Ok(CompositeMaps {
            maps: with_concentration(&summed, num_exchangeable_protons),
            coverage: self.coverage()?,
        })
    }
}

/// Full-image maps assembled from all ROIs of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeMaps {
    maps: BTreeMap<Quantity, ParameterMap>,
    coverage: Option<RoiMask>,
}

impl CompositeMaps {
    pub fn get(&self, quantity: Quantity) -> Option<&ParameterMap> {
        self.maps.get(&quantity)
    }

    pub fn maps(&self) -> &BTreeMap<Quantity, ParameterMap> {
        &self.maps
    }

    /// Union of the ROI masks the composite was built from.
    pub fn coverage(&self) -> Option<&RoiMask> {
        self.coverage.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Pixels of `quantity` that hold data, for rendering everything else transparent.
    pub fn display_mask(&self, quantity: Quantity) -> Option<RoiMask> {
        self.maps.get(&quantity).map(|m| m.data_mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roi(name: &str, mask: RoiMask, t1w: f64) -> RoiResult {
        let n = mask.count();
        let mut maps = BTreeMap::new();
        maps.insert(Quantity::T1w, ParameterMap::scatter(&vec![t1w; n], &mask).unwrap());
        maps.insert(Quantity::Fs, ParameterMap::scatter(&vec![0.02; n], &mask).unwrap());
        RoiResult::new(name, mask, maps).unwrap()
    }

    #[test]
    fn test_empty_result_has_all_zero_maps() {
        let result = RoiResult::empty("blank", RoiMask::empty(3, 4));
        assert_eq!(result.maps().len(), Quantity::MATCHED.len());
        for map in result.maps().values() {
            assert_eq!(map.shape(), (3, 4));
            assert!(map.nonzero_values().is_empty());
        }
        assert_eq!(result.n_pixels(), 0);
    }

    #[test]
    fn test_composite_of_disjoint_rois() {
        let mut results = ResultsByRoi::new();
        results.push(roi("left", RoiMask::from_fn(2, 2, |_, c| c == 0), 1.0)).unwrap();
        results.push(roi("right", RoiMask::from_fn(2, 2, |_, c| c == 1), 2.0)).unwrap();

        let composite = results.composite(None, OverlapPolicy::Sum).unwrap();
        let t1w = composite.get(Quantity::T1w).unwrap();
        assert_eq!(t1w.get(0, 0), 1.0);
        assert_eq!(t1w.get(1, 1), 2.0);
        assert_eq!(composite.coverage().unwrap().count(), 4);
        assert!(composite.get(Quantity::Fs).is_some());
    }

    #[test]
    fn test_composite_with_concentration() {
        let mut results = ResultsByRoi::new();
        results.push(roi("only", RoiMask::from_fn(1, 2, |_, c| c == 0), 1.0)).unwrap();
        let composite = results.composite(Some(4.0), OverlapPolicy::Sum).unwrap();
        assert!(composite.get(Quantity::Fs).is_none());
        let conc = composite.get(Quantity::Concentration).unwrap();
        assert!((conc.get(0, 0) - 555.0).abs() < 1e-9);
        assert!(!composite.display_mask(Quantity::Concentration).unwrap().get(0, 1));
    }

    #[test]
    fn test_overlap_policy() {
        let mut results = ResultsByRoi::new();
        results.push(roi("a", RoiMask::full(2, 2), 1.0)).unwrap();
        results.push(roi("b", RoiMask::from_fn(2, 2, |r, _| r == 0), 2.0)).unwrap();
        assert_eq!(results.overlap_count(), 2);

        let summed = results.composite(None, OverlapPolicy::Sum).unwrap();
        assert_eq!(summed.get(Quantity::T1w).unwrap().get(0, 0), 3.0);
        assert!(matches!(
            results.composite(None, OverlapPolicy::Reject),
            Err(MrfError::OverlappingRois(2))
        ));
    }

    #[test]
    fn test_empty_results_composite_is_empty() {
        let composite = ResultsByRoi::new().composite(None, OverlapPolicy::Reject).unwrap();
        assert!(composite.is_empty());
        assert!(composite.coverage().is_none());
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_results() {
        let bad_mask = r#"{"rois":[{"name":"a","mask":{"rows":2,"cols":2,"data":[true,true,true,true,true]},"maps":{}}]}"#;
        assert!(serde_json::from_str::<ResultsByRoi>(bad_mask).is_err());
        let mixed = r#"{"rois":[{"name":"a","mask":{"rows":1,"cols":1,"data":[true]},"maps":{}},{"name":"b","mask":{"rows":2,"cols":1,"data":[true,false]},"maps":{}}]}"#;
        assert!(serde_json::from_str::<ResultsByRoi>(mixed).is_err());

        let mut results = ResultsByRoi::new();
        results.push(roi("left", RoiMask::from_fn(2, 2, |_, c| c == 0), 1.0)).unwrap();
        let text = serde_json::to_string(&results).unwrap();
        assert_eq!(serde_json::from_str::<ResultsByRoi>(&text).unwrap(), results);
    }

    #[test]
    fn test_push_rejects_duplicates_and_shapes() {
        let mut results = ResultsByRoi::new();
        results.push(RoiResult::empty("a", RoiMask::empty(2, 2))).unwrap();
        assert!(results.push(RoiResult::empty("a", RoiMask::empty(2, 2))).is_err());
        assert!(results.push(RoiResult::empty("b", RoiMask::empty(3, 2))).is_err());
    }
}

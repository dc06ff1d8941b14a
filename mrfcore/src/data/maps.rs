use std::collections::BTreeMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use crate::data::image::RoiMask;
use crate::data::quantity::Quantity;
use crate::error::{shape_mismatch, Result};

/// A single quantitative parameter over the image plane.
///
/// Pixels outside the originating ROI hold `0.0`, which doubles as the "no data" value:
/// a matched value that is genuinely zero cannot be told apart from an unmapped pixel
/// without the ROI mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterMap {
    values: DMatrix<f64>,
}

impl ParameterMap {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        ParameterMap { values: DMatrix::zeros(rows, cols) }
    }

    pub fn from_matrix(values: DMatrix<f64>) -> Self {
        ParameterMap { values }
    }

    /// Writes per-pixel values into the masked positions of an otherwise zero map.
    ///
    /// # Arguments
    ///
    /// * `values` - one value per selected pixel, in the row-major order of `mask.pixels()`
    /// * `mask` - the ROI the values were matched for
    ///
    pub fn scatter(values: &[f64], mask: &RoiMask) -> Result<Self> {
        let n_selected = mask.count();
        if values.len() != n_selected {
            return Err(shape_mismatch("map assembly", n_selected, values.len()));
        }
        let (rows, cols) = mask.shape();
        let mut map = ParameterMap::zeros(rows, cols);
        for ((r, c), &v) in mask.pixels().zip(values.iter()) {
            map.values[(r, c)] = v;
        }
        Ok(map)
    }

    /// Reads the masked positions back out, in row-major order.
    pub fn gather(&self, mask: &RoiMask) -> Result<Vec<f64>> {
        if mask.shape() != self.shape() {
            return Err(shape_mismatch("map gather", self.shape(), mask.shape()));
        }
        Ok(mask.pixels().map(|(r, c)| self.values[(r, c)]).collect())
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Values of all pixels holding data, in row-major order.
    pub fn nonzero_values(&self) -> Vec<f64> {
        let (rows, cols) = self.shape();
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let v = self.values[(r, c)];
                if v != 0.0 {
                    out.push(v);
                }
            }
        }
        out
    }

    /// Pixels holding data; the renderer draws everything else transparent.
    pub fn data_mask(&self) -> RoiMask {
        let (rows, cols) = self.shape();
        RoiMask::from_fn(rows, cols, |r, c| self.values[(r, c)] != 0.0)
    }

    pub fn scaled(&self, factor: f64) -> ParameterMap {
        ParameterMap { values: &self.values * factor }
    }

    pub fn accumulate(&mut self, other: &ParameterMap) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(shape_mismatch("map composition", self.shape(), other.shape()));
        }
        self.values += &other.values;
        Ok(())
    }
}

/// Scatters every per-pixel result vector back onto the image plane of `mask`.
pub fn assemble_maps(
    per_pixel: &BTreeMap<Quantity, Vec<f64>>,
    mask: &RoiMask,
) -> Result<BTreeMap<Quantity, ParameterMap>> {
    per_pixel
        .iter()
        .map(|(q, values)| ParameterMap::scatter(values, mask).map(|map| (*q, map)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scatter_leaves_zero_outside_mask() {
        let mask = RoiMask::from_fn(2, 3, |r, c| r == 1 && c > 0);
        let map = ParameterMap::scatter(&[4.0, 5.0], &mask).unwrap();
        assert_eq!(map.shape(), (2, 3));
        assert_eq!(map.get(1, 1), 4.0);
        assert_eq!(map.get(1, 2), 5.0);
        assert_eq!(map.get(0, 0), 0.0);
        assert_eq!(map.get(1, 0), 0.0);
        assert_eq!(map.gather(&mask).unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_scatter_rejects_wrong_length() {
        let mask = RoiMask::full(2, 2);
        assert!(ParameterMap::scatter(&[1.0, 2.0, 3.0], &mask).is_err());
    }

    #[test]
    fn test_data_mask_and_nonzero() {
        let mask = RoiMask::from_fn(2, 2, |r, c| r == c);
        let map = ParameterMap::scatter(&[1.5, 0.0], &mask).unwrap();
        assert_eq!(map.nonzero_values(), vec![1.5]);
        let data = map.data_mask();
        assert!(data.get(0, 0));
        assert!(!data.get(1, 1));
    }

    #[test]
    fn test_accumulate_shape_checked() {
        let mut a = ParameterMap::zeros(2, 2);
        assert!(a.accumulate(&ParameterMap::zeros(2, 3)).is_err());
        let b = ParameterMap::scatter(&[2.0], &RoiMask::from_fn(2, 2, |r, c| r == 0 && c == 1)).unwrap();
        a.accumulate(&b).unwrap();
        a.accumulate(&b).unwrap();
        assert_eq!(a.get(0, 1), 4.0);
    }

    #[test]
    fn test_assemble_maps() {
        let mask = RoiMask::from_fn(1, 3, |_, c| c != 1);
        let mut per_pixel = BTreeMap::new();
        per_pixel.insert(Quantity::T1w, vec![1.0, 3.0]);
        per_pixel.insert(Quantity::Dp, vec![0.9, 0.8]);
        let maps = assemble_maps(&per_pixel, &mask).unwrap();
        assert_eq!(maps[&Quantity::T1w].get(0, 2), 3.0);
        assert_eq!(maps[&Quantity::Dp].get(0, 1), 0.0);
    }
}

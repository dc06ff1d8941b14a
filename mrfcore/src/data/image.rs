use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use crate::error::{shape_mismatch, MrfError, Result};

/// A stack of acquired images, `rows x cols` pixels by `frames` repetitions.
///
/// Values are stored row-major with the frame index fastest, so the trajectory of a
/// single pixel is a contiguous slice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ImageStackRepr")]
pub struct ImageStack {
    rows: usize,
    cols: usize,
    frames: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct ImageStackRepr {
    rows: usize,
    cols: usize,
    frames: usize,
    data: Vec<f64>,
}

impl TryFrom<ImageStackRepr> for ImageStack {
    type Error = MrfError;

    fn try_from(repr: ImageStackRepr) -> Result<Self> {
        ImageStack::new(repr.rows, repr.cols, repr.frames, repr.data)
    }
}

impl ImageStack {
    pub fn new(rows: usize, cols: usize, frames: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols * frames {
            return Err(shape_mismatch("image stack data", rows * cols * frames, data.len()));
        }
        Ok(ImageStack { rows, cols, frames, data })
    }

    pub fn zeros(rows: usize, cols: usize, frames: usize) -> Self {
        ImageStack { rows, cols, frames, data: vec![0.0; rows * cols * frames] }
    }

    /// Builds a stack from a function of `(row, col, frame)`.
    pub fn from_fn<F: Fn(usize, usize, usize) -> f64>(rows: usize, cols: usize, frames: usize, f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols * frames);
        for r in 0..rows {
            for c in 0..cols {
                for t in 0..frames {
                    data.push(f(r, c, t));
                }
            }
        }
        ImageStack { rows, cols, frames, data }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn cols(&self) -> usize { self.cols }
    pub fn frames(&self) -> usize { self.frames }
    pub fn data(&self) -> &[f64] { &self.data }

    pub fn spatial_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        (row * self.cols + col) * self.frames
    }

    /// Signal trajectory of one pixel.
    pub fn trajectory(&self, row: usize, col: usize) -> &[f64] {
        let start = self.offset(row, col);
        &self.data[start..start + self.frames]
    }

    pub fn set_trajectory(&mut self, row: usize, col: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.frames {
            return Err(shape_mismatch("pixel trajectory", self.frames, values.len()));
        }
        let start = self.offset(row, col);
        self.data[start..start + self.frames].copy_from_slice(values);
        Ok(())
    }

    /// Collects the trajectories of all masked pixels as the columns of a `frames x n` matrix.
    ///
    /// Pixels are taken in row-major order, the same order `ParameterMap::scatter` writes them back.
    pub fn select(&self, mask: &RoiMask) -> Result<DMatrix<f64>> {
        if mask.shape() != self.spatial_shape() {
            return Err(shape_mismatch("ROI mask", self.spatial_shape(), mask.shape()));
        }
        let pixels: Vec<(usize, usize)> = mask.pixels().collect();
        let mut selected = DMatrix::zeros(self.frames, pixels.len());
        for (j, (r, c)) in pixels.into_iter().enumerate() {
            selected.column_mut(j).copy_from_slice(self.trajectory(r, c));
        }
        Ok(selected)
    }
}

/// A boolean region of interest over the image plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoiMaskRepr")]
pub struct RoiMask {
    rows: usize,
    cols: usize,
    data: Vec<bool>,
}

#[derive(Deserialize)]
struct RoiMaskRepr {
    rows: usize,
    cols: usize,
    data: Vec<bool>,
}

impl TryFrom<RoiMaskRepr> for RoiMask {
    type Error = MrfError;

    fn try_from(repr: RoiMaskRepr) -> Result<Self> {
        RoiMask::new(repr.rows, repr.cols, repr.data)
    }
}

impl RoiMask {
    pub fn new(rows: usize, cols: usize, data: Vec<bool>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(shape_mismatch("ROI mask data", rows * cols, data.len()));
        }
        Ok(RoiMask { rows, cols, data })
    }

    pub fn empty(rows: usize, cols: usize) -> Self {
        RoiMask { rows, cols, data: vec![false; rows * cols] }
    }

    pub fn full(rows: usize, cols: usize) -> Self {
        RoiMask { rows, cols, data: vec![true; rows * cols] }
    }

    pub fn from_fn<F: Fn(usize, usize) -> bool>(rows: usize, cols: usize, f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        RoiMask { rows, cols, data }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.cols + col]
    }

    /// Number of selected pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&b| b)
    }

    /// Selected pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| (i / cols, i % cols))
    }

    pub fn union(&self, other: &RoiMask) -> Result<RoiMask> {
        if self.shape() != other.shape() {
            return Err(shape_mismatch("ROI mask union", self.shape(), other.shape()));
        }
        let data = self.data.iter().zip(other.data.iter()).map(|(&a, &b)| a || b).collect();
        Ok(RoiMask { rows: self.rows, cols: self.cols, data })
    }

    /// Number of pixels selected by both masks.
    pub fn overlap_count(&self, other: &RoiMask) -> Result<usize> {
        if self.shape() != other.shape() {
            return Err(shape_mismatch("ROI mask overlap", self.shape(), other.shape()));
        }
        Ok(self.data.iter().zip(other.data.iter()).filter(|(a, b)| **a && **b).count())
    }
}

/// Named ROI masks, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoiSetRepr")]
pub struct RoiSet {
    entries: Vec<(String, RoiMask)>,
}

#[derive(Deserialize)]
struct RoiSetRepr {
    entries: Vec<(String, RoiMask)>,
}

impl TryFrom<RoiSetRepr> for RoiSet {
    type Error = MrfError;

    fn try_from(repr: RoiSetRepr) -> Result<Self> {
        let mut rois = RoiSet::new();
        for (name, mask) in repr.entries {
            rois.insert(name, mask)?;
        }
        Ok(rois)
    }
}

impl RoiSet {
    pub fn new() -> Self {
        RoiSet { entries: Vec::new() }
    }

    /// Adds a mask; names must be unique and all masks must share one shape.
    pub fn insert(&mut self, name: impl Into<String>, mask: RoiMask) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(MrfError::DuplicateRoi(name));
        }
        if let Some((_, first)) = self.entries.first() {
            if first.shape() != mask.shape() {
                return Err(shape_mismatch("ROI set", first.shape(), mask.shape()));
            }
        }
        self.entries.push((name, mask));
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, mask: RoiMask) -> Result<Self> {
        self.insert(name, mask)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RoiMask> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoiMask)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pixels claimed by more than one mask.
    pub fn overlap_count(&self) -> usize {
        let Some((_, first)) = self.entries.first() else { return 0 };
        let (rows, cols) = first.shape();
        let mut claims = vec![0u32; rows * cols];
        for (_, mask) in &self.entries {
            for (i, &b) in mask.data().iter().enumerate() {
                if b {
                    claims[i] += 1;
                }
            }
        }
        claims.iter().filter(|&&n| n > 1).count()
    }
}

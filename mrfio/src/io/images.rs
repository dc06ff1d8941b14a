use std::fs::File;
use std::io::{BufReader, BufWriter};
use serde::{Deserialize, Serialize};
use mrfcore::config::AnalysisConfig;
use mrfcore::data::image::{ImageStack, RoiMask, RoiSet};
use crate::error::Result;

/// On-disk form of an image stack: row-major, frame index fastest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackFile {
    pub rows: usize,
    pub cols: usize,
    pub frames: usize,
    pub data: Vec<f64>,
}

impl From<&ImageStack> for StackFile {
    fn from(stack: &ImageStack) -> Self {
        StackFile {
            rows: stack.rows(),
            cols: stack.cols(),
            frames: stack.frames(),
            data: stack.data().to_vec(),
        }
    }
}

/// On-disk form of one named ROI mask, row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskRow {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<bool>,
}

pub fn load_image_stack(path: &str) -> Result<ImageStack> {
    let f = BufReader::new(File::open(path)?);
    let sf: StackFile = serde_json::from_reader(f)?;
    let stack = ImageStack::new(sf.rows, sf.cols, sf.frames, sf.data)?;
    log::info!("loaded image stack {}: {}x{} pixels, {} frames", path, stack.rows(), stack.cols(), stack.frames());
    Ok(stack)
}

pub fn save_image_stack(path: &str, stack: &ImageStack) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, &StackFile::from(stack))?;
    Ok(())
}

/// Reads named ROI masks, keeping file order.
pub fn load_roi_set(path: &str) -> Result<RoiSet> {
    let f = BufReader::new(File::open(path)?);
    let rows: Vec<MaskRow> = serde_json::from_reader(f)?;
    let mut rois = RoiSet::new();
    for row in rows {
        let mask = RoiMask::new(row.rows, row.cols, row.data)?;
        if mask.is_empty() {
            log::warn!("ROI '{}' in {} selects no pixels", row.name, path);
        }
        rois.insert(row.name, mask)?;
    }
    let overlap = rois.overlap_count();
    if overlap > 0 {
        log::warn!("ROI masks in {} overlap at {} pixel(s)", path, overlap);
    }
    Ok(rois)
}

pub fn save_roi_set(path: &str, rois: &RoiSet) -> Result<()> {
    let rows: Vec<MaskRow> = rois
        .iter()
        .map(|(name, mask)| {
            let (r, c) = mask.shape();
            MaskRow { name: name.to_string(), rows: r, cols: c, data: mask.data().to_vec() }
        })
        .collect();
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, &rows)?;
    Ok(())
}

/// Reads an analysis configuration; absent fields take their defaults.
pub fn load_config(path: &str) -> Result<AnalysisConfig> {
    let f = BufReader::new(File::open(path)?);
    let config: AnalysisConfig = serde_json::from_reader(f)?;
    config.validate()?;
    Ok(config)
}

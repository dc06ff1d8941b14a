use std::fs::File;
use std::io::{BufReader, BufWriter};
use serde::{Deserialize, Serialize};
use mrfcore::algorithm::statistics::StatisticsTable;
use mrfcore::data::results::{CompositeMaps, ResultsByRoi};
use crate::error::{IoError, Result};

const RESULTS_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    pub version: u32,
    pub results: ResultsByRoi,
}

impl ResultsFile {
    pub fn new(results: ResultsByRoi) -> Self {
        Self { version: RESULTS_FILE_VERSION, results }
    }

    fn into_results(self) -> Result<ResultsByRoi> {
        if self.version != RESULTS_FILE_VERSION {
            return Err(IoError::Version(self.version));
        }
        Ok(self.results)
    }
}

// --- Bincode + optional zstd compression ---
pub fn save_results(path: &str, results: &ResultsByRoi, compress: bool) -> Result<()> {
    let f = File::create(path)?;
    let rf = ResultsFile::new(results.clone());
    if compress {
        let mut zw = zstd::Encoder::new(f, 3)?;
        bincode::serialize_into(&mut zw, &rf)?;
        zw.finish()?;
    } else {
        let mut bw = BufWriter::new(f);
        bincode::serialize_into(&mut bw, &rf)?;
    }
    Ok(())
}

pub fn load_results(path: &str) -> Result<ResultsByRoi> {
    // Try zstd first, then plain bincode
    if let Ok(mut zr) = zstd::Decoder::new(File::open(path)?) {
        if let Ok(rf) = bincode::deserialize_from::<_, ResultsFile>(&mut zr) {
            return rf.into_results();
        }
    }
    let f = BufReader::new(File::open(path)?);
    let rf: ResultsFile = bincode::deserialize_from(f)?;
    rf.into_results()
}

// --- JSON (human-readable) ---
pub fn save_results_json(path: &str, results: &ResultsByRoi) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, &ResultsFile::new(results.clone()))?;
    Ok(())
}

pub fn load_results_json(path: &str) -> Result<ResultsByRoi> {
    let f = BufReader::new(File::open(path)?);
    let rf: ResultsFile = serde_json::from_reader(f)?;
    rf.into_results()
}

pub fn save_composite_json(path: &str, composite: &CompositeMaps) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, composite)?;
    Ok(())
}

/// One (ROI, quantity) cell of a statistics table, flattened for reporting.
///
/// Empty summaries are written with `mean` and `std_dev` set to null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub roi: String,
    pub quantity: String,
    pub label: String,
    pub unit: String,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub count: usize,
}

pub fn statistics_records(table: &StatisticsTable) -> Vec<StatisticsRecord> {
    let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
    table
        .rows()
        .iter()
        .flat_map(|row| {
            row.columns.iter().map(move |(q, s)| StatisticsRecord {
                roi: row.roi.clone(),
                quantity: q.name().to_string(),
                label: q.label().to_string(),
                unit: q.display_unit().to_string(),
                mean: finite(s.mean),
                std_dev: finite(s.std_dev),
                count: s.count,
            })
        })
        .collect()
}

pub fn save_statistics_json(path: &str, table: &StatisticsTable) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(f, &statistics_records(table))?;
    Ok(())
}

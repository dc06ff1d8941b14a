use std::fmt::Debug;
use thiserror::Error;

/// Errors raised by dictionary loading, matching and aggregation.
///
/// Format and shape errors are never recovered locally; empty ROI selections and
/// empty statistics are not errors and produce neutral outputs instead.
#[derive(Debug, Error)]
pub enum MrfError {
    #[error("dictionary format error: {0}")]
    DictionaryFormat(String),

    #[error("dictionary has no entries")]
    EmptyDictionary,

    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("duplicate ROI name: {0}")]
    DuplicateRoi(String),

    #[error("ROI masks overlap at {0} pixel(s)")]
    OverlappingRois(usize),
}

pub type Result<T> = std::result::Result<T, MrfError>;

pub(crate) fn shape_mismatch<E: Debug, A: Debug>(context: &'static str, expected: E, actual: A) -> MrfError {
    MrfError::ShapeMismatch {
        context,
        expected: format!("{:?}", expected),
        actual: format!("{:?}", actual),
    }
}

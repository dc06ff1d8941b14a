pub mod raw;
pub mod layout;

use std::collections::BTreeMap;
use nalgebra::DMatrix;
use crate::algorithm::normalize::normalize_columns;
use crate::data::quantity::Quantity;
use crate::error::{shape_mismatch, MrfError, Result};
use self::layout::{parse_dictionary, SIGNAL_FIELD};
use self::raw::{RawArray, RawRecord};

/// A simulation dictionary in canonical form.
///
/// # Description
///
/// `signals` holds one simulated trajectory per column (`frames x entries`); every
/// tissue parameter vector has one value per column.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Dictionary {
    signals: DMatrix<f64>,
    parameters: BTreeMap<Quantity, Vec<f64>>,
}

impl Dictionary {
    /// Constructs a new `Dictionary`.
    ///
    /// # Arguments
    ///
    /// * `signals` - simulated trajectories, `frames x entries`
    /// * `parameters` - one vector per dictionary parameter, each of length `entries`
    ///
    pub fn new(signals: DMatrix<f64>, parameters: BTreeMap<Quantity, Vec<f64>>) -> Result<Self> {
        for q in Quantity::DICTIONARY_PARAMETERS {
            if !parameters.contains_key(&q) {
                return Err(MrfError::DictionaryFormat(format!("parameter {} missing", q)));
            }
        }
        for (q, values) in &parameters {
            if !q.is_dictionary_parameter() {
                return Err(MrfError::DictionaryFormat(format!("{} is not a dictionary parameter", q)));
            }
            if values.len() != signals.ncols() {
                return Err(shape_mismatch("dictionary parameter length", signals.ncols(), values.len()));
            }
        }
        Ok(Dictionary { signals, parameters })
    }

    /// Reads a dictionary from its stored field view, legacy nested or flat.
    pub fn from_record(record: &RawRecord) -> Result<Self> {
        parse_dictionary(record)
    }

    /// Writes the dictionary back as a flat record.
    pub fn to_record(&self) -> RawRecord {
        let mut record = RawRecord::new().with_array(SIGNAL_FIELD, RawArray::matrix(&self.signals.transpose()));
        for (q, values) in &self.parameters {
            if let Some(key) = q.flat_aliases().first() {
                record = record.with_array(*key, RawArray::row(values.clone()));
            }
        }
        record
    }

    pub fn n_entries(&self) -> usize {
        self.signals.ncols()
    }

    pub fn n_frames(&self) -> usize {
        self.signals.nrows()
    }

    pub fn signals(&self) -> &DMatrix<f64> {
        &self.signals
    }

    pub fn parameter(&self, quantity: Quantity) -> Option<&[f64]> {
        self.parameters.get(&quantity).map(|v| v.as_slice())
    }

    pub fn parameters(&self) -> &BTreeMap<Quantity, Vec<f64>> {
        &self.parameters
    }

    /// Signal trajectories scaled to unit L2 norm.
    pub fn normalized_signals(&self) -> DMatrix<f64> {
        normalize_columns(&self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_dictionary() -> Dictionary {
        let mut parameters = BTreeMap::new();
        for (i, q) in Quantity::DICTIONARY_PARAMETERS.iter().enumerate() {
            parameters.insert(*q, vec![i as f64, i as f64 + 0.5, i as f64 + 0.25]);
        }
        Dictionary::new(DMatrix::identity(3, 3), parameters).unwrap()
    }

    #[test]
    fn test_missing_parameter_rejected() {
        let mut parameters = BTreeMap::new();
        parameters.insert(Quantity::T1w, vec![1.0]);
        assert!(Dictionary::new(DMatrix::zeros(2, 1), parameters).is_err());
    }

    #[test]
    fn test_parameter_length_checked() {
        let dictionary = identity_dictionary();
        let mut parameters = dictionary.parameters().clone();
        parameters.insert(Quantity::Fs, vec![0.1]);
        assert!(matches!(
            Dictionary::new(DMatrix::identity(3, 3), parameters),
            Err(MrfError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_record_round_trip() {
        let dictionary = identity_dictionary();
        let record = dictionary.to_record();
        assert!(record.contains("ksw_0"));
        assert_eq!(Dictionary::from_record(&record).unwrap(), dictionary);
    }
}

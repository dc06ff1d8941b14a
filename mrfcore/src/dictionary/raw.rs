use std::collections::BTreeMap;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use crate::error::{shape_mismatch, MrfError, Result};

/// A named numeric array as stored in a dictionary file, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl RawArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(shape_mismatch("raw array", expected, data.len()));
        }
        Ok(RawArray { shape, data })
    }

    /// A `1 x n` row vector.
    pub fn row(data: Vec<f64>) -> Self {
        RawArray { shape: vec![1, data.len()], data }
    }

    /// An `n x 1` column vector.
    pub fn column(data: Vec<f64>) -> Self {
        RawArray { shape: vec![data.len(), 1], data }
    }

    pub fn matrix(matrix: &DMatrix<f64>) -> Self {
        let (rows, cols) = matrix.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(matrix[(r, c)]);
            }
        }
        RawArray { shape: vec![rows, cols], data }
    }

    fn check_len(&self) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(MrfError::DictionaryFormat(format!(
                "array of shape {:?} holds {} values",
                self.shape,
                self.data.len()
            )));
        }
        Ok(())
    }

    fn squeezed_shape(&self) -> Vec<usize> {
        self.shape.iter().copied().filter(|&d| d != 1).collect()
    }

    /// Interprets the array as a 2-D matrix, dropping singleton axes beyond the second.
    pub fn to_matrix(&self) -> Result<DMatrix<f64>> {
        self.check_len()?;
        let (rows, cols) = match self.shape.as_slice() {
            [] => (1, 1),
            [n] => (1, *n),
            [r, c] => (*r, *c),
            _ => match self.squeezed_shape().as_slice() {
                [] => (1, 1),
                [n] => (1, *n),
                [r, c] => (*r, *c),
                other => {
                    return Err(MrfError::DictionaryFormat(format!(
                        "expected a 2-D signal array, got shape {:?}",
                        other
                    )))
                }
            },
        };
        Ok(DMatrix::from_row_slice(rows, cols, &self.data))
    }

    /// Flattens a vector-shaped array (any number of singleton axes) to 1-D.
    pub fn to_vector(&self) -> Result<Vec<f64>> {
        self.check_len()?;
        if self.squeezed_shape().len() > 1 {
            return Err(MrfError::DictionaryFormat(format!(
                "expected a parameter vector, got shape {:?}",
                self.shape
            )));
        }
        Ok(self.data.clone())
    }
}

/// One value of a dictionary file: either an array or a nested record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Array(RawArray),
    Record(RawRecord),
}

/// Random-access view over the named fields of a dictionary file.
///
/// Keys starting with `_` are private header entries (file version, globals) and are
/// not considered dictionary content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        RawRecord { fields: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn with_array(mut self, key: impl Into<String>, array: RawArray) -> Self {
        self.insert(key, RawValue::Array(array));
        self
    }

    pub fn with_record(mut self, key: impl Into<String>, record: RawRecord) -> Self {
        self.insert(key, RawValue::Record(record));
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn array(&self, key: &str) -> Option<&RawArray> {
        match self.fields.get(key) {
            Some(RawValue::Array(a)) => Some(a),
            _ => None,
        }
    }

    pub fn record(&self, key: &str) -> Option<&RawRecord> {
        match self.fields.get(key) {
            Some(RawValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Keys that do not start with `_`.
    pub fn public_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().filter(|k| !k.starts_with('_'))
    }
}

use std::collections::BTreeMap;
use itertools::Itertools;
use nalgebra::DMatrix;
use crate::data::quantity::Quantity;
use crate::dictionary::raw::{RawArray, RawRecord, RawValue};
use crate::dictionary::Dictionary;
use crate::error::{MrfError, Result};

/// Name of the simulated signal field in both layouts.
pub const SIGNAL_FIELD: &str = "sig";

/// Storage layouts of simulation dictionaries.
///
/// # Description
///
/// Older dictionaries wrap every field in a single struct-like sub-record and store
/// signals as `frames x entries`. Newer dictionaries are flat, store signals as
/// `entries x frames` and may carry `_0`-suffixed parameter names.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictionaryLayout {
    LegacyNested,
    Flat,
}

/// Axis of the stored signal array that runs over dictionary entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryAxis {
    Rows,
    Columns,
}

impl DictionaryLayout {
    /// A top-level record with fewer than four public keys is a legacy wrapper.
    pub fn detect(record: &RawRecord) -> DictionaryLayout {
        if record.public_keys().count() < 4 {
            DictionaryLayout::LegacyNested
        } else {
            DictionaryLayout::Flat
        }
    }

    pub fn alternate(&self) -> DictionaryLayout {
        match self {
            DictionaryLayout::LegacyNested => DictionaryLayout::Flat,
            DictionaryLayout::Flat => DictionaryLayout::LegacyNested,
        }
    }

    pub fn parse(&self, record: &RawRecord) -> Result<Dictionary> {
        match self {
            DictionaryLayout::LegacyNested => parse_legacy(record),
            DictionaryLayout::Flat => parse_flat(record),
        }
    }
}

/// Parses a dictionary in whichever layout it was stored.
///
/// The detected layout is tried first and the other one second; if both fail the
/// error reports both attempts.
pub fn parse_dictionary(record: &RawRecord) -> Result<Dictionary> {
    let layout = DictionaryLayout::detect(record);
    match layout.parse(record) {
        Ok(dictionary) => {
            log::debug!("parsed dictionary as {:?}", layout);
            Ok(dictionary)
        }
        Err(primary) => {
            log::debug!("{:?} dictionary parse failed: {}", layout, primary);
            let alternate = layout.alternate();
            alternate.parse(record).map_err(|secondary| {
                MrfError::DictionaryFormat(format!(
                    "unrecognized dictionary ({:?}: {}; {:?}: {})",
                    layout, primary, alternate, secondary
                ))
            })
        }
    }
}

fn parse_legacy(record: &RawRecord) -> Result<Dictionary> {
    let wrapped: Vec<(&str, &RawRecord)> = record
        .public_keys()
        .filter_map(|k| record.record(k).map(|r| (k, r)))
        .collect();
    let inner = match wrapped.as_slice() {
        [(_, inner)] => *inner,
        [] => return Err(MrfError::DictionaryFormat("no wrapped dictionary record found".to_string())),
        _ => {
            return Err(MrfError::DictionaryFormat(format!(
                "ambiguous wrapped dictionary, candidates: {}",
                wrapped.iter().map(|(k, _)| *k).join(", ")
            )))
        }
    };

    let mut parameters = BTreeMap::new();
    for q in Quantity::DICTIONARY_PARAMETERS {
        // legacy_field is always Some for dictionary parameters
        let field = q.legacy_field().unwrap_or(q.name());
        let array = required_array(inner, field)?;
        parameters.insert(q, array.to_vector()?);
    }
    let signal = required_array(inner, SIGNAL_FIELD)?;
    build(signal, parameters, EntryAxis::Columns)
}

fn parse_flat(record: &RawRecord) -> Result<Dictionary> {
    let mut parameters = BTreeMap::new();
    for q in Quantity::DICTIONARY_PARAMETERS {
        let aliases = q.flat_aliases();
        let key = aliases.iter().find(|k| record.contains(k)).ok_or_else(|| {
            MrfError::DictionaryFormat(format!("parameter {} missing, tried {}", q, aliases.iter().join(", ")))
        })?;
        parameters.insert(q, required_array(record, key)?.to_vector()?);
    }
    let signal = required_array(record, SIGNAL_FIELD)?;
    build(signal, parameters, EntryAxis::Rows)
}

fn required_array<'a>(record: &'a RawRecord, key: &str) -> Result<&'a RawArray> {
    match record.get(key) {
        Some(RawValue::Array(a)) => Ok(a),
        Some(RawValue::Record(_)) => Err(MrfError::DictionaryFormat(format!("field '{}' is not an array", key))),
        None => Err(MrfError::DictionaryFormat(format!("field '{}' is missing", key))),
    }
}

fn build(signal: &RawArray, parameters: BTreeMap<Quantity, Vec<f64>>, stored: EntryAxis) -> Result<Dictionary> {
    let n_entries = parameters.values().next().map(|v| v.len()).unwrap_or(0);
    if let Some((q, v)) = parameters.iter().find(|(_, v)| v.len() != n_entries) {
        return Err(MrfError::DictionaryFormat(format!(
            "parameter {} has {} entries, expected {}",
            q,
            v.len(),
            n_entries
        )));
    }
    let signals = orient(signal.to_matrix()?, n_entries, stored)?;
    Dictionary::new(signals, parameters)
}

/// Returns the signal matrix as `frames x entries`.
///
/// The layout's storage orientation is preferred; when only the other axis matches
/// the entry count the array is read the other way round.
fn orient(signal: DMatrix<f64>, n_entries: usize, stored: EntryAxis) -> Result<DMatrix<f64>> {
    let (rows, cols) = signal.shape();
    let (entry_len, other_len) = match stored {
        EntryAxis::Rows => (rows, cols),
        EntryAxis::Columns => (cols, rows),
    };
    let entries_on_rows = if entry_len == n_entries {
        stored == EntryAxis::Rows
    } else if other_len == n_entries {
        stored == EntryAxis::Columns
    } else {
        return Err(MrfError::DictionaryFormat(format!(
            "signal array {}x{} does not match {} parameter entries",
            rows, cols, n_entries
        )));
    };
    Ok(if entries_on_rows { signal.transpose() } else { signal })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(record: RawRecord, names: [&str; 6], values: &[f64], column: bool) -> RawRecord {
        names.iter().enumerate().fold(record, |r, (i, name)| {
            let v: Vec<f64> = values.iter().map(|x| x + i as f64).collect();
            r.with_array(*name, if column { RawArray::column(v) } else { RawArray::row(v) })
        })
    }

    fn flat_record() -> RawRecord {
        // 2 entries x 3 frames
        let sig = RawArray::new(vec![2, 3], vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        params(
            RawRecord::new().with_array("sig", sig),
            ["t1w", "t2w", "t1s_0", "t2s_0", "fs_0", "ksw_0"],
            &[10.0, 20.0],
            false,
        )
    }

    fn legacy_record() -> RawRecord {
        // 3 frames x 2 entries
        let sig = RawArray::new(vec![3, 2], vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        let inner = params(
            RawRecord::new().with_array("sig", sig),
            ["t1w", "t2w", "t1s", "t2s", "fs", "ksw"],
            &[10.0, 20.0],
            true,
        );
        RawRecord::new()
            .with_array("__header__", RawArray::row(vec![]))
            .with_array("__version__", RawArray::row(vec![1.0]))
            .with_array("__globals__", RawArray::row(vec![]))
            .with_record("dict", inner)
    }

    #[test]
    fn test_detect() {
        assert_eq!(DictionaryLayout::detect(&flat_record()), DictionaryLayout::Flat);

        // four keys in total, only the wrapper is public
        let legacy = legacy_record();
        assert_eq!(legacy.keys().count(), 4);
        assert_eq!(legacy.public_keys().count(), 1);
        assert_eq!(DictionaryLayout::detect(&legacy), DictionaryLayout::LegacyNested);
        assert!(DictionaryLayout::LegacyNested.parse(&legacy).is_ok());
    }

    #[test]
    fn test_both_layouts_agree() {
        let flat = parse_dictionary(&flat_record()).unwrap();
        let legacy = parse_dictionary(&legacy_record()).unwrap();
        assert_eq!(flat.n_entries(), 2);
        assert_eq!(flat.n_frames(), 3);
        assert_eq!(flat.signals(), legacy.signals());
        assert_eq!(flat.signals()[(1, 1)], 1.0);
        for q in Quantity::DICTIONARY_PARAMETERS {
            assert_eq!(flat.parameter(q), legacy.parameter(q));
        }
        assert_eq!(flat.parameter(Quantity::T1s).unwrap(), &[12.0, 22.0]);
    }

    #[test]
    fn test_first_alias_wins() {
        let record = flat_record().with_array("ksw", RawArray::row(vec![-1.0, -1.0]));
        let dictionary = parse_dictionary(&record).unwrap();
        assert_eq!(dictionary.parameter(Quantity::Ksw).unwrap(), &[15.0, 25.0]);
    }

    #[test]
    fn test_unsuffixed_alias_used_when_alone() {
        let sig = RawArray::new(vec![2, 1], vec![1.0, 2.0]).unwrap();
        let record = params(
            RawRecord::new().with_array("sig", sig),
            ["t1w", "t2w", "t1s", "t2s", "fs", "ksw"],
            &[1.0, 2.0],
            false,
        );
        let dictionary = parse_dictionary(&record).unwrap();
        assert_eq!(dictionary.parameter(Quantity::Fs).unwrap(), &[5.0, 6.0]);
        assert_eq!(dictionary.n_frames(), 1);
    }

    #[test]
    fn test_missing_signal_is_format_error() {
        let mut record = RawRecord::new();
        for key in ["t1w", "t2w", "t1s_0", "t2s_0", "fs_0", "ksw_0"] {
            record.insert(key, RawValue::Array(RawArray::row(vec![1.0])));
        }
        let err = parse_dictionary(&record).unwrap_err();
        assert!(matches!(err, MrfError::DictionaryFormat(_)));
        assert!(err.to_string().contains("sig"));
    }

    #[test]
    fn test_mismatched_parameter_lengths_rejected() {
        let record = flat_record().with_array("t1w", RawArray::row(vec![1.0, 2.0, 3.0]));
        assert!(parse_dictionary(&record).is_err());
    }

    #[test]
    fn test_signal_transposed_when_needed() {
        // flat file whose signal was stored frames x entries
        let sig = RawArray::new(vec![3, 2], vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        let record = flat_record().with_array("sig", sig);
        let dictionary = parse_dictionary(&record).unwrap();
        assert_eq!(dictionary.n_frames(), 3);
        assert_eq!(dictionary.n_entries(), 2);
    }
}

use std::fs::File;
use std::io::{BufReader, BufWriter};
use mrfcore::dictionary::raw::RawRecord;
use mrfcore::dictionary::Dictionary;
use crate::error::Result;

/// Reads the field tree of a dictionary file without interpreting it.
pub fn load_raw_record(path: &str) -> Result<RawRecord> {
    let f = BufReader::new(File::open(path)?);
    let record: RawRecord = serde_json::from_reader(f)?;
    Ok(record)
}

/// Reads a simulation dictionary, legacy nested or flat.
pub fn load_dictionary(path: &str) -> Result<Dictionary> {
    let record = load_raw_record(path)?;
    let dictionary = Dictionary::from_record(&record)?;
    log::info!(
        "loaded dictionary {}: {} entries x {} frames",
        path,
        dictionary.n_entries(),
        dictionary.n_frames()
    );
    Ok(dictionary)
}

/// Writes a dictionary in the flat layout.
pub fn save_dictionary(path: &str, dictionary: &Dictionary) -> Result<()> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, &dictionary.to_record())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use mrfcore::data::quantity::Quantity;
    use mrfcore::error::MrfError;
    use crate::error::IoError;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("mrfio-{}-{}", std::process::id(), name))
            .to_string_lossy()
            .to_string()
    }

    const LEGACY: &str = r#"{
        "__header__": {"shape": [1], "data": [0.0]},
        "__version__": {"shape": [1], "data": [1.0]},
        "dict": {
            "sig": {"shape": [3, 2], "data": [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]},
            "t1w": {"shape": [2, 1], "data": [1.1, 2.2]},
            "t2w": {"shape": [2, 1], "data": [0.04, 0.05]},
            "t1s": {"shape": [2, 1], "data": [1.7, 1.7]},
            "t2s": {"shape": [2, 1], "data": [0.1, 0.1]},
            "fs":  {"shape": [2, 1], "data": [0.01, 0.02]},
            "ksw": {"shape": [2, 1], "data": [100.0, 200.0]}
        }
    }"#;

    #[test]
    fn test_load_legacy_and_save_flat() {
        let legacy_path = temp_path("legacy.json");
        File::create(&legacy_path).unwrap().write_all(LEGACY.as_bytes()).unwrap();
        let dictionary = load_dictionary(&legacy_path).unwrap();
        assert_eq!(dictionary.n_entries(), 2);
        assert_eq!(dictionary.n_frames(), 3);
        assert_eq!(dictionary.parameter(Quantity::Ksw).unwrap(), &[100.0, 200.0]);

        let flat_path = temp_path("flat.json");
        save_dictionary(&flat_path, &dictionary).unwrap();
        let raw = load_raw_record(&flat_path).unwrap();
        assert!(raw.contains("fs_0"));
        assert_eq!(load_dictionary(&flat_path).unwrap(), dictionary);

        std::fs::remove_file(legacy_path).ok();
        std::fs::remove_file(flat_path).ok();
    }

    #[test]
    fn test_missing_signal_surfaces_format_error() {
        let path = temp_path("nosig.json");
        let content = LEGACY.replace("\"sig\"", "\"signal\"");
        File::create(&path).unwrap().write_all(content.as_bytes()).unwrap();
        let err = load_dictionary(&path).unwrap_err();
        assert!(matches!(err, IoError::Mrf(MrfError::DictionaryFormat(_))));
        std::fs::remove_file(path).ok();
    }
}

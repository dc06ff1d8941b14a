use std::fmt;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// A quantity reported by a matching run.
///
/// # Description
///
/// The six tissue parameters stored in a simulation dictionary, the similarity score of
/// the best match (`dp`) and the solute concentration derived from `fs`.
/// Variants are declared in display order, so ordered maps keyed by `Quantity` iterate
/// in the order parameter maps are presented.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    T1w,
    T2w,
    Ksw,
    Fs,
    #[serde(rename = "conc")]
    Concentration,
    Dp,
    T1s,
    T2s,
}

impl Quantity {
    /// Tissue parameters every dictionary must provide.
    pub const DICTIONARY_PARAMETERS: [Quantity; 6] = [
        Quantity::T1w,
        Quantity::T2w,
        Quantity::T1s,
        Quantity::T2s,
        Quantity::Fs,
        Quantity::Ksw,
    ];

    /// Maps produced for every ROI of a matching run.
    pub const MATCHED: [Quantity; 7] = [
        Quantity::Dp,
        Quantity::T1w,
        Quantity::T2w,
        Quantity::Fs,
        Quantity::Ksw,
        Quantity::T1s,
        Quantity::T2s,
    ];

    /// Returns the `Quantity` for a canonical short name.
    ///
    /// # Arguments
    ///
    /// * `name` - A canonical name such as `t1w` or `conc`.
    ///
    pub fn from_name(name: &str) -> Option<Quantity> {
        match name {
            "t1w" => Some(Quantity::T1w),
            "t2w" => Some(Quantity::T2w),
            "ksw" => Some(Quantity::Ksw),
            "fs" => Some(Quantity::Fs),
            "conc" => Some(Quantity::Concentration),
            "dp" => Some(Quantity::Dp),
            "t1s" => Some(Quantity::T1s),
            "t2s" => Some(Quantity::T2s),
            _ => None,
        }
    }

    /// Canonical short name.
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::T1w => "t1w",
            Quantity::T2w => "t2w",
            Quantity::Ksw => "ksw",
            Quantity::Fs => "fs",
            Quantity::Concentration => "conc",
            Quantity::Dp => "dp",
            Quantity::T1s => "t1s",
            Quantity::T2s => "t2s",
        }
    }

    /// Keys tried, in priority order, when reading this parameter from a flat dictionary.
    pub fn flat_aliases(&self) -> &'static [&'static str] {
        match self {
            Quantity::T1w => &["t1w"],
            Quantity::T2w => &["t2w"],
            Quantity::T1s => &["t1s_0", "t1s"],
            Quantity::T2s => &["t2s_0", "t2s"],
            Quantity::Fs => &["fs_0", "fs"],
            Quantity::Ksw => &["ksw_0", "ksw"],
            Quantity::Concentration | Quantity::Dp => &[],
        }
    }

    /// Field name of this parameter inside a legacy nested dictionary.
    pub fn legacy_field(&self) -> Option<&'static str> {
        match self {
            Quantity::Concentration | Quantity::Dp => None,
            _ => Some(self.name()),
        }
    }

    pub fn is_dictionary_parameter(&self) -> bool {
        Quantity::DICTIONARY_PARAMETERS.contains(self)
    }

    /// Human readable label used for map titles and colorbars.
    pub fn label(&self) -> &'static str {
        match self {
            Quantity::T1w => "T1 (Water)",
            Quantity::T2w => "T2 (Water)",
            Quantity::Ksw => "Exchange Rate (ksw)",
            Quantity::Fs => "Solute Fraction (fs)",
            Quantity::Concentration => "Solute Concentration",
            Quantity::Dp => "Dot Product",
            Quantity::T1s => "T1 (Solute)",
            Quantity::T2s => "T2 (Solute)",
        }
    }

    /// Native unit of the matched values.
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::T1w | Quantity::T2w | Quantity::T1s | Quantity::T2s => "s",
            Quantity::Ksw => "Hz",
            Quantity::Concentration => "mM",
            Quantity::Fs | Quantity::Dp => "a.u.",
        }
    }

    /// Factor applied to native values before they are summarized.
    ///
    /// T2 values are reported in milliseconds, everything else keeps its native unit.
    pub fn display_scale(&self) -> f64 {
        match self {
            Quantity::T2w | Quantity::T2s => 1000.0,
            _ => 1.0,
        }
    }

    /// Unit of summarized values, after `display_scale` is applied.
    pub fn display_unit(&self) -> &'static str {
        match self {
            Quantity::T2w | Quantity::T2s => "ms",
            _ => self.unit(),
        }
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for q in Quantity::MATCHED.iter().chain([Quantity::Concentration].iter()) {
            assert_eq!(Quantity::from_name(q.name()), Some(*q));
        }
        assert_eq!(Quantity::from_name("b1"), None);
    }

    #[test]
    fn test_exchange_rate_prefers_suffixed_alias() {
        assert_eq!(Quantity::Ksw.flat_aliases(), &["ksw_0", "ksw"]);
        assert_eq!(Quantity::T1w.flat_aliases(), &["t1w"]);
    }

    #[test]
    fn test_t2_reported_in_ms() {
        assert_eq!(Quantity::T2w.display_scale(), 1000.0);
        assert_eq!(Quantity::T2s.display_unit(), "ms");
        assert_eq!(Quantity::T1w.display_scale(), 1.0);
        assert_eq!(Quantity::Dp.display_scale(), 1.0);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Quantity::Concentration).unwrap();
        assert_eq!(json, "\"conc\"");
        let q: Quantity = serde_json::from_str("\"t2s\"").unwrap();
        assert_eq!(q, Quantity::T2s);
    }
}

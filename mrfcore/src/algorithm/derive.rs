use std::collections::BTreeMap;
use crate::data::maps::ParameterMap;
use crate::data::quantity::Quantity;

/// Approximate proton concentration of water, in mM.
pub const WATER_PROTON_CONCENTRATION_MM: f64 = 111_000.0;

/// Converts a solute proton fraction to a solute concentration in mM.
///
/// # Arguments
///
/// * `fraction` - solute proton fraction relative to water
/// * `num_exchangeable_protons` - exchangeable protons per solute molecule
///
pub fn fraction_to_concentration(fraction: f64, num_exchangeable_protons: f64) -> f64 {
    fraction * WATER_PROTON_CONCENTRATION_MM / num_exchangeable_protons
}

/// Returns a copy of `maps` in which `fs` is replaced by `conc` when a positive proton
/// count is given. Otherwise the maps are returned unchanged.
pub fn with_concentration(
    maps: &BTreeMap<Quantity, ParameterMap>,
    num_exchangeable_protons: Option<f64>,
) -> BTreeMap<Quantity, ParameterMap> {
    let mut out = maps.clone();
    if let Some(protons) = num_exchangeable_protons.filter(|&n| n > 0.0) {
        if let Some(fraction) = out.remove(&Quantity::Fs) {
            out.insert(Quantity::Concentration, fraction.scaled(fraction_to_concentration(1.0, protons)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::image::RoiMask;

    #[test]
    fn test_creatine_concentration() {
        let conc = fraction_to_concentration(0.02, 4.0);
        assert!((conc - 555.0).abs() < 1e-9);
    }

    #[test]
    fn test_fraction_replaced_by_concentration() {
        let mask = RoiMask::from_fn(1, 2, |_, c| c == 0);
        let mut maps = BTreeMap::new();
        maps.insert(Quantity::Fs, ParameterMap::scatter(&[0.02], &mask).unwrap());
        maps.insert(Quantity::T1w, ParameterMap::scatter(&[1.2], &mask).unwrap());

        let derived = with_concentration(&maps, Some(4.0));
        assert!(!derived.contains_key(&Quantity::Fs));
        assert!((derived[&Quantity::Concentration].get(0, 0) - 555.0).abs() < 1e-9);
        assert_eq!(derived[&Quantity::Concentration].get(0, 1), 0.0);
        assert_eq!(derived[&Quantity::T1w].get(0, 0), 1.2);
    }

    #[test]
    fn test_non_positive_protons_ignored() {
        let mut maps = BTreeMap::new();
        maps.insert(Quantity::Fs, ParameterMap::zeros(1, 1));
        assert_eq!(with_concentration(&maps, Some(0.0)), maps);
        assert_eq!(with_concentration(&maps, Some(-2.0)), maps);
        assert_eq!(with_concentration(&maps, None), maps);
    }
}

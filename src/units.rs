// [[file:../mace.note::*header][header:1]]
//! Unit conversion between the host simulation and the model.
//!
//! Models work in Å and eV. Hosts default to nm and kJ/mol.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use serde::{Deserialize, Serialize};
// imports:1 ends here

// [[file:../mace.note::6b1d3e0f][6b1d3e0f]]
pub const ANGSTROM_PER_NM: f64 = 10.0;
pub const KJ_PER_MOL_PER_EV: f64 = 96.4853;
pub const KJ_PER_KCAL: f64 = 4.184;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    #[serde(rename = "nm")]
    Nanometer,
    #[serde(rename = "angstrom")]
    Angstrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyUnit {
    #[serde(rename = "kJ/mol")]
    KilojoulePerMole,
    #[serde(rename = "kcal/mol")]
    KilocaloriePerMole,
    #[serde(rename = "eV")]
    ElectronVolt,
}

/// Units the host supplies positions in and expects energies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSystem {
    pub length: LengthUnit,
    pub energy: EnergyUnit,
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self {
            length: LengthUnit::Nanometer,
            energy: EnergyUnit::KilojoulePerMole,
        }
    }
}

impl UnitSystem {
    /// Factor taking host lengths to Å.
    pub fn length_scale(&self) -> f64 {
        match self.length {
            LengthUnit::Nanometer => ANGSTROM_PER_NM,
            LengthUnit::Angstrom => 1.0,
        }
    }

    /// Factor taking eV to host energies.
    pub fn energy_scale(&self) -> f64 {
        match self.energy {
            EnergyUnit::KilojoulePerMole => KJ_PER_MOL_PER_EV,
            EnergyUnit::KilocaloriePerMole => KJ_PER_MOL_PER_EV / KJ_PER_KCAL,
            EnergyUnit::ElectronVolt => 1.0,
        }
    }
}
// 6b1d3e0f ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_unit_system() {
    let units = UnitSystem::default();
    assert_eq!(units.length_scale(), 10.0);
    assert_eq!(units.energy_scale(), 96.4853);

    let units: UnitSystem = serde_json::from_str(r#"{"length": "angstrom", "energy": "kcal/mol"}"#).unwrap();
    assert_eq!(units.length_scale(), 1.0);
    approx::assert_relative_eq!(units.energy_scale(), 23.0605, epsilon = 1e-4);
}
// test:1 ends here

// [[file:../mace.note::*header][header:1]]
//! The black-box graph model consumed by the adapter, and the options that
//! select how it is run.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::core::*;
use crate::error::PotentialError;
use crate::graph::GraphInput;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
// imports:1 ends here

// [[file:../mace.note::8c2e5f71][8c2e5f71]]
/// Working floating point precision of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Single => "single",
            Precision::Double => "double",
        }
    }

    /// Round `x` to this precision.
    pub fn cast(&self, x: f64) -> f64 {
        match self {
            Precision::Single => x as f32 as f64,
            Precision::Double => x,
        }
    }

    pub(crate) fn cast3(&self, v: [f64; 3]) -> [f64; 3] {
        [self.cast(v[0]), self.cast(v[1]), self.cast(v[2])]
    }
}

impl FromStr for Precision {
    type Err = PotentialError;

    fn from_str(s: &str) -> std::result::Result<Self, PotentialError> {
        match s {
            "single" => Ok(Precision::Single),
            "double" => Ok(Precision::Double),
            _ => Err(PotentialError::UnsupportedPrecision { value: s.into() }),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which energy the adapter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyKind {
    /// total energy minus the isolated-atom energies
    InteractionEnergy,
    /// total energy including isolated-atom energies
    Energy,
}

impl EnergyKind {
    /// Key of this energy in the model output.
    pub fn key(&self) -> &'static str {
        match self {
            EnergyKind::InteractionEnergy => "interaction_energy",
            EnergyKind::Energy => "energy",
        }
    }
}

impl Default for EnergyKind {
    fn default() -> Self {
        EnergyKind::Energy
    }
}

impl FromStr for EnergyKind {
    type Err = PotentialError;

    fn from_str(s: &str) -> std::result::Result<Self, PotentialError> {
        match s {
            "interaction_energy" => Ok(EnergyKind::InteractionEnergy),
            "energy" => Ok(EnergyKind::Energy),
            _ => Err(PotentialError::UnsupportedEnergyKind { value: s.into() }),
        }
    }
}

impl fmt::Display for EnergyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
// 8c2e5f71 ends here

// [[file:../mace.note::d04a9b36][d04a9b36]]
/// Named scalar outputs of one model call. A key may be present without a
/// value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    values: HashMap<String, Option<f64>>,
}

impl ModelOutput {
    pub fn insert(&mut self, key: impl Into<String>, value: Option<f64>) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied().flatten()
    }

    /// The requested energy; absent keys and empty values are both errors.
    pub fn energy(&self, kind: EnergyKind) -> Result<f64> {
        match self.get(kind.key()) {
            Some(e) => Ok(e),
            None => Err(PotentialError::MissingEnergyOutput { kind: kind.key().into() }.into()),
        }
    }
}

/// A graph-neural-network potential treated as a black box.
///
/// Implementations map a `GraphInput` in model units (Å) to named energies
/// in eV. Parameters are read-only once loaded.
pub trait GraphModel {
    /// The atomic numbers the model was trained on, in model order.
    fn atomic_numbers(&self) -> Vec<usize>;

    /// The interaction cutoff in Å.
    fn r_max(&self) -> f64;

    /// The native precision of the model parameters.
    fn precision(&self) -> Precision;

    /// Return a copy of the model working in `precision`.
    fn to_precision(&self, precision: Precision) -> Box<dyn GraphModel>;

    /// Evaluate the model. Gradients are only computed when `compute_force`
    /// is set.
    fn forward(&self, input: &GraphInput, compute_force: bool) -> Result<ModelOutput>;
}
// d04a9b36 ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_model_options() {
    assert_eq!("single".parse::<Precision>(), Ok(Precision::Single));
    assert_eq!(
        "half".parse::<Precision>(),
        Err(PotentialError::UnsupportedPrecision { value: "half".into() })
    );
    assert_eq!(Precision::Single.cast(0.1), 0.1f32 as f64);

    assert_eq!("interaction_energy".parse::<EnergyKind>(), Ok(EnergyKind::InteractionEnergy));
    assert!("free_energy".parse::<EnergyKind>().is_err());
    assert_eq!(EnergyKind::default().key(), "energy");
}

#[test]
fn test_model_output() {
    let mut out = ModelOutput::default();
    out.insert("energy", Some(-1.5));
    out.insert("interaction_energy", None);
    assert_eq!(out.energy(EnergyKind::Energy).unwrap(), -1.5);

    let err = out.energy(EnergyKind::InteractionEnergy).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PotentialError>(),
        Some(PotentialError::MissingEnergyOutput { .. })
    ));
}
// test:1 ends here

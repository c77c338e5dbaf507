// [[file:../mace.note::b456354a][b456354a]]
use std::fmt;

use crate::model::EnergyKind;

use serde::{Deserialize, Serialize};
// b456354a ends here

// [[file:../mace.note::7de724a0][7de724a0]]
const MODEL_PROPERTIES_FORMAT_VERSION: &str = "0.1";

/// The energy computed for the host, in host units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    energy: Option<f64>,
    energy_kind: Option<EnergyKind>,
}
// 7de724a0 ends here

// [[file:../mace.note::37f15603][37f15603]]
impl Computed {
    /// Return true if there is no useful properties
    pub fn is_empty(&self) -> bool {
        self.energy.is_none()
    }
}

impl fmt::Display for Computed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "@model_properties_format_version {}", MODEL_PROPERTIES_FORMAT_VERSION)?;
        if let Some(energy) = &self.energy {
            match &self.energy_kind {
                Some(kind) => writeln!(f, "@energy kind={}", kind)?,
                None => writeln!(f, "@energy")?,
            }
            writeln!(f, "{:-20.12E}", energy)?;
        }

        Ok(())
    }
}
// 37f15603 ends here

impl Computed {
    /// Set item energy.
    pub fn set_energy(&mut self, e: f64) {
        self.energy = Some(e);
    }

    /// Set which energy the item holds.
    pub fn set_energy_kind(&mut self, kind: EnergyKind) {
        self.energy_kind = Some(kind);
    }

    /// Get energy component.
    pub fn get_energy(&self) -> Option<f64> {
        self.energy
    }

    /// Get the kind of the energy component.
    pub fn get_energy_kind(&self) -> Option<EnergyKind> {
        self.energy_kind
    }
}

// [[file:../mace.note::6d51755f][6d51755f]]
#[test]
fn test_model_properties_format() -> gut::prelude::Result<()> {
    let mut r = Computed::default();
    assert!(r.is_empty());
    assert_eq!(r.to_string(), "@model_properties_format_version 0.1\n");

    r.set_energy(-125.0);
    r.set_energy_kind(EnergyKind::InteractionEnergy);
    assert!(!r.is_empty());
    let txt = r.to_string();
    let lines: Vec<_> = txt.lines().collect();
    assert_eq!(lines[1], "@energy kind=interaction_energy");
    assert_eq!(lines[2].trim().parse::<f64>()?, -125.0);

    // serializing and deserializing
    let serialized = serde_json::to_string(&r)?;
    let r2: Computed = serde_json::from_str(&serialized)?;
    assert_eq!(r2, r);
    assert_eq!(r2.get_energy_kind(), Some(EnergyKind::InteractionEnergy));

    Ok(())
}
// 6d51755f ends here

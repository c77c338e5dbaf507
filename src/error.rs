// [[file:../mace.note::*error][error:1]]
//! Error kinds raised by the graph construction and evaluation pipeline.
//!
//! All kinds are fatal: nothing in this crate retries. Functions return
//! `gut::prelude::Result`, so callers tell the kinds apart with
//! `err.downcast_ref::<PotentialError>()`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PotentialError {
    #[error("atomic number {number} is not in the species table {table:?}")]
    UnknownSpecies { number: usize, table: Vec<usize> },

    #[error("invalid cell: {reason}")]
    InvalidCell { reason: String },

    #[error("unsupported precision `{value}`; supported values are `single` and `double`")]
    UnsupportedPrecision { value: String },

    #[error("no model source available for model `{name}`")]
    MissingModelSource { name: String },

    #[error("model returned no value for energy kind `{kind}`")]
    MissingEnergyOutput { kind: String },

    #[error("unsupported energy kind `{value}`; supported values are `interaction_energy` and `energy`")]
    UnsupportedEnergyKind { value: String },

    #[error("unsupported model `{name}`")]
    UnsupportedModel { name: String },

    #[error("invalid active region: {reason}")]
    InvalidRegion { reason: String },

    #[error("invalid cutoff radius {cutoff}: {reason}")]
    InvalidCutoff { cutoff: f64, reason: String },

    #[error("found {found} neighbor pairs, exceeding capacity {capacity}")]
    TooManyPairs { found: usize, capacity: usize },
}

impl PotentialError {
    pub(crate) fn invalid_cell(reason: impl Into<String>) -> Self {
        PotentialError::InvalidCell { reason: reason.into() }
    }

    pub(crate) fn invalid_region(reason: impl Into<String>) -> Self {
        PotentialError::InvalidRegion { reason: reason.into() }
    }
}
// error:1 ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_error_downcast() {
    use gut::prelude::*;

    let err: Error = PotentialError::UnsupportedPrecision { value: "half".into() }.into();
    let kind = err.downcast_ref::<PotentialError>().expect("typed error");
    assert_eq!(kind, &PotentialError::UnsupportedPrecision { value: "half".into() });
    assert!(err.to_string().contains("`half`"));
}
// test:1 ends here

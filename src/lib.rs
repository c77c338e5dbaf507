// [[file:../mace.note::*common][common:1]]
pub(crate) mod core {
    pub use gut::prelude::*;
    pub use log::{debug, info, trace, warn};
}
// common:1 ends here

// [[file:../mace.note::*mods][mods:1]]
mod adapter;
mod artifact;
mod cell;
mod error;
mod graph;
mod lj;
mod model;
mod model_properties;
mod neighbors;
mod registry;
mod shifts;
mod species;
mod units;
// mods:1 ends here

// [[file:../mace.note::bf8cc73b][bf8cc73b]]
use crate::core::*;

use gchemol::Molecule;

/// Trait for chemical calculations
pub trait ChemicalModel {
    /// Define how to compute molecular properties, such as energy.
    fn compute(&mut self, mol: &Molecule) -> Result<Computed>;

    /// Define how to compute the properties of a bunch of molecules.
    fn compute_bunch(&mut self, mols: &[Molecule]) -> Result<Vec<Computed>> {
        mols.iter().map(|mol| self.compute(mol)).collect()
    }
}
// bf8cc73b ends here

// [[file:../mace.note::*pub][pub:1]]
pub use crate::adapter::{AdapterOptions, EnergyEvaluator, PotentialAdapter, Topology, DEFAULT_ARTIFACT_FILENAME};
pub use crate::artifact::PipelineArtifact;
pub use crate::cell::Cell;
pub use crate::error::PotentialError;
pub use crate::graph::{GraphAssembler, GraphInput};
pub use crate::lj::LennardJones;
pub use crate::model::{EnergyKind, GraphModel, ModelOutput, Precision};
pub use crate::model_properties::*;
pub use crate::neighbors::{NeighborFinder, NeighborPairs, PaddedPairs, SearchStrategy, PAIR_SENTINEL};
pub use crate::registry::{
    ExternalModelForce, FoundationSize, HostSystem, MacePotentialImpl, MacePotentialImplFactory, ModelLoader,
    ModelSource, PotentialImpl, PotentialImplFactory, PotentialRegistry,
};
pub use crate::shifts::{Edges, ShiftResolver};
pub use crate::species::{NodeAttributes, SpeciesEncoder, SpeciesTable};
pub use crate::units::{EnergyUnit, LengthUnit, UnitSystem};
// pub:1 ends here

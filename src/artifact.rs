// [[file:../mace.note::*header][header:1]]
//! Self-contained description of a configured pipeline, persisted for hosts
//! that load external model forces from a file.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::adapter::{AdapterOptions, PotentialAdapter, Topology};
use crate::core::*;
use crate::model::{EnergyKind, Precision};
use crate::registry::{ModelLoader, ModelSource};
use crate::species::SpeciesTable;
use crate::units::UnitSystem;

use serde::{Deserialize, Serialize};
use std::path::Path;
// imports:1 ends here

// [[file:../mace.note::a3c5e7f1][a3c5e7f1]]
const ARTIFACT_FORMAT_VERSION: &str = "0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub format_version: String,
    pub model_name: String,
    pub model_source: ModelSource,
    /// species table of the model
    pub species: SpeciesTable,
    /// atomic numbers of all host atoms
    pub atomic_numbers: Vec<usize>,
    /// sorted indices of the evaluated atoms
    pub atoms: Vec<usize>,
    pub periodic: bool,
    pub precision: Precision,
    pub energy_kind: EnergyKind,
    pub units: UnitSystem,
    pub length_scale: f64,
    pub energy_scale: f64,
    /// cutoff radius in Å
    pub r_max: f64,
    pub force_group: usize,
}

impl PipelineArtifact {
    /// Describe a configured `adapter` built for `topology`.
    pub fn describe(
        model_name: &str,
        model_source: ModelSource,
        adapter: &PotentialAdapter,
        topology: &Topology,
        force_group: usize,
    ) -> Self {
        let units = adapter.units();
        Self {
            format_version: ARTIFACT_FORMAT_VERSION.into(),
            model_name: model_name.into(),
            model_source,
            species: adapter.species().clone(),
            atomic_numbers: topology.atomic_numbers.clone(),
            atoms: adapter.indices().to_vec(),
            periodic: adapter.is_periodic(),
            precision: adapter.precision(),
            energy_kind: adapter.energy_kind(),
            units,
            length_scale: units.length_scale(),
            energy_scale: units.energy_scale(),
            r_max: adapter.cutoff(),
            force_group,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize pipeline artifact")?;
        std::fs::write(path, json).with_context(|| format!("write pipeline artifact to {:?}", path))?;
        info!("pipeline artifact saved to {:?}", path);

        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("read pipeline artifact from {:?}", path))?;
        let artifact: Self =
            serde_json::from_str(&json).with_context(|| format!("parse pipeline artifact {:?}", path))?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            bail!(
                "unsupported artifact format version {} in {:?}",
                artifact.format_version,
                path
            );
        }

        Ok(artifact)
    }

    /// The adapter options this artifact was built with.
    pub fn options(&self) -> AdapterOptions {
        AdapterOptions {
            atoms: Some(self.atoms.clone()),
            force_group: self.force_group,
            precision: Some(self.precision.as_str().into()),
            return_energy_type: self.energy_kind.key().into(),
            units: self.units,
            ..Default::default()
        }
    }

    /// Rebuild the adapter, loading the model through `loader`. The loaded
    /// model must have the recorded species table.
    pub fn restore(&self, loader: &dyn ModelLoader) -> Result<PotentialAdapter> {
        let model = loader
            .load(&self.model_source)
            .with_context(|| format!("load model {} from {:?}", self.model_name, self.model_source))?;
        let species = SpeciesTable::new(model.atomic_numbers());
        if species != self.species {
            bail!(
                "model species {:?} differ from recorded species {:?}",
                species.numbers(),
                self.species.numbers()
            );
        }
        let topology = Topology {
            atomic_numbers: self.atomic_numbers.clone(),
            box_vectors: None,
            uses_periodic_boundary_conditions: self.periodic,
        };

        PotentialAdapter::new(model, &topology, &self.options())
    }
}
// a3c5e7f1 ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_artifact_roundtrip() -> Result<()> {
    use crate::lj::LennardJones;
    use crate::model::GraphModel;
    use approx::*;

    let topology = Topology::new(vec![8, 1, 1, 6]);
    let options = AdapterOptions {
        atoms: Some(vec![2, 0, 1]),
        precision: Some("single".into()),
        return_energy_type: "interaction_energy".into(),
        ..Default::default()
    };
    let adapter = PotentialAdapter::new(Box::new(LennardJones::default()), &topology, &options)?;
    let source = ModelSource::File("lj.model".into());
    let artifact = PipelineArtifact::describe("mace", source, &adapter, &topology, 1);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("macemodel.json");
    artifact.save(&path)?;
    let loaded = PipelineArtifact::load(&path)?;
    assert_eq!(loaded, artifact);
    assert_eq!(loaded.atoms, vec![0, 1, 2]);
    assert_eq!(loaded.length_scale, 10.0);

    let loader = |_: &ModelSource| -> Result<Box<dyn GraphModel>> { Ok(Box::new(LennardJones::default())) };
    let restored = loaded.restore(&loader)?;
    assert_eq!(restored.precision(), Precision::Single);
    assert_eq!(restored.energy_kind(), EnergyKind::InteractionEnergy);

    let positions = [[0.0, 0.0, 0.0], [0.096, 0.0, 0.0], [-0.024, 0.093, 0.0], [1.0, 1.0, 1.0]];
    assert_relative_eq!(
        restored.evaluate(&positions, None)?,
        adapter.evaluate(&positions, None)?,
        epsilon = 1e-9
    );

    // a model with other species cannot stand in
    let loader = |_: &ModelSource| -> Result<Box<dyn GraphModel>> {
        let mut lj = LennardJones::default();
        lj.atomic_energies.pop();
        Ok(Box::new(lj))
    };
    assert!(loaded.restore(&loader).is_err());

    Ok(())
}
// test:1 ends here

// [[file:../mace.note::*header][header:1]]
//! Drives a graph model from host coordinates to a host-unit energy.
//!
//! # Usage
//!
//! ```ignore
//! use gosh_mace::*;
//!
//! let topology = Topology::new(vec![8, 1, 1]);
//! let adapter = PotentialAdapter::new(Box::new(model), &topology, &AdapterOptions::default())?;
//!
//! // positions in nm, energy in kJ/mol
//! let energy = adapter.evaluate(&positions, None)?;
//! ```
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::cell::Cell;
use crate::core::*;
use crate::error::PotentialError;
use crate::graph::{GraphAssembler, GraphInput};
use crate::model::{EnergyKind, GraphModel, Precision};
use crate::neighbors::NeighborFinder;
use crate::shifts::ShiftResolver;
use crate::species::{SpeciesEncoder, SpeciesTable};
use crate::units::UnitSystem;
use crate::{ChemicalModel, Computed};

use gchemol::Molecule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
// imports:1 ends here

// [[file:../mace.note::2a6f0d93][2a6f0d93]]
pub const DEFAULT_ARTIFACT_FILENAME: &str = "macemodel.json";

/// Construction-time options of a `PotentialAdapter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Indices of the atoms to evaluate. All atoms when absent.
    pub atoms: Option<Vec<usize>>,
    /// Force group the host assigns the energy to.
    pub force_group: usize,
    /// `single` or `double`; the model's own precision when absent.
    pub precision: Option<String>,
    /// `energy` or `interaction_energy`.
    pub return_energy_type: String,
    /// Where the pipeline artifact is written.
    pub filename: PathBuf,
    /// Host units.
    pub units: UnitSystem,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            atoms: None,
            force_group: 0,
            precision: None,
            return_energy_type: EnergyKind::Energy.key().into(),
            filename: DEFAULT_ARTIFACT_FILENAME.into(),
            units: UnitSystem::default(),
        }
    }
}

impl AdapterOptions {
    /// Read options from a JSON document; missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options = serde_json::from_str(json).context("parse adapter options")?;
        Ok(options)
    }

    /// Read options from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("read adapter options from {:?}", path))?;
        Self::from_json(&json)
    }

    pub fn energy_kind(&self) -> Result<EnergyKind> {
        Ok(self.return_energy_type.parse()?)
    }

    /// The working precision for a model whose native precision is `native`.
    pub fn precision_or(&self, native: Precision) -> Result<Precision> {
        match &self.precision {
            None => Ok(native),
            Some(s) => Ok(s.parse()?),
        }
    }
}
// 2a6f0d93 ends here

// [[file:../mace.note::74c0b3e8][74c0b3e8]]
/// What the adapter needs to know about the host system at construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    /// Atomic number of every host atom.
    pub atomic_numbers: Vec<usize>,
    /// Default periodic box vectors, as rows.
    pub box_vectors: Option<[[f64; 3]; 3]>,
    /// Whether the host applies periodic boundary conditions.
    pub uses_periodic_boundary_conditions: bool,
}

impl Topology {
    pub fn new(atomic_numbers: Vec<usize>) -> Self {
        Self {
            atomic_numbers,
            ..Default::default()
        }
    }

    pub fn with_box_vectors(mut self, box_vectors: [[f64; 3]; 3]) -> Self {
        self.box_vectors = Some(box_vectors);
        self
    }

    /// Topology of a molecule; its lattice, if any, becomes the periodic box.
    pub fn from_molecule(mol: &Molecule) -> Self {
        let atomic_numbers = mol.atoms().map(|(_, a)| a.number()).collect();
        let box_vectors: Option<[[f64; 3]; 3]> = mol.get_lattice().map(|lat| lat.matrix().into());
        Self {
            atomic_numbers,
            box_vectors,
            uses_periodic_boundary_conditions: false,
        }
    }

    pub fn natoms(&self) -> usize {
        self.atomic_numbers.len()
    }

    pub fn is_periodic(&self) -> bool {
        self.box_vectors.is_some() || self.uses_periodic_boundary_conditions
    }
}

// sorted, unique, in-range region indices
fn resolve_region(atoms: Option<&[usize]>, natoms: usize) -> Result<Vec<usize>> {
    let indices = match atoms {
        None => (0..natoms).collect(),
        Some(atoms) => {
            let mut indices = atoms.to_vec();
            indices.sort_unstable();
            for w in indices.windows(2) {
                if w[0] == w[1] {
                    return Err(PotentialError::invalid_region(format!("atom {} selected twice", w[0])).into());
                }
            }
            if let Some(&i) = indices.last() {
                if i >= natoms {
                    return Err(PotentialError::invalid_region(format!(
                        "atom index {} out of range for {} atoms",
                        i, natoms
                    ))
                    .into());
                }
            }
            indices
        }
    };
    if indices.is_empty() {
        return Err(PotentialError::invalid_region("no atoms to evaluate").into());
    }

    Ok(indices)
}
// 74c0b3e8 ends here

// [[file:../mace.note::c5d81f2e][c5d81f2e]]
/// Evaluates a `GraphModel` for host coordinates.
///
/// Everything that depends only on the topology (species features, region
/// indices, batch metadata) is computed once here; the neighbor graph is
/// rebuilt on every call.
pub struct PotentialAdapter {
    model: Box<dyn GraphModel>,
    species: SpeciesTable,
    precision: Precision,
    energy_kind: EnergyKind,
    units: UnitSystem,
    /// host atom count
    natoms: usize,
    /// sorted host indices of the evaluated atoms
    indices: Vec<usize>,
    /// atomic numbers of the evaluated atoms
    region_numbers: Vec<usize>,
    periodic: bool,
    finder: NeighborFinder,
    assembler: GraphAssembler,
    ncalls: AtomicUsize,
}

impl PotentialAdapter {
    /// Bind `model` to `topology`. All configuration errors surface here.
    pub fn new(model: Box<dyn GraphModel>, topology: &Topology, options: &AdapterOptions) -> Result<Self> {
        let energy_kind = options.energy_kind()?;
        let native = model.precision();
        let precision = options.precision_or(native)?;
        let model = if precision != native {
            info!(
                "Model precision is {} and requested precision is {}. The model will be converted.",
                native, precision
            );
            model.to_precision(precision)
        } else {
            model
        };

        let natoms = topology.natoms();
        let indices = resolve_region(options.atoms.as_deref(), natoms)?;
        let region_numbers: Vec<usize> = indices.iter().map(|&i| topology.atomic_numbers[i]).collect();

        let species = SpeciesTable::new(model.atomic_numbers());
        let node_attrs = SpeciesEncoder::new(species.clone())
            .encode(&region_numbers)?
            .map_values(|x| precision.cast(x));
        let finder = NeighborFinder::new(model.r_max())?;
        let periodic = topology.is_periodic();
        let assembler = GraphAssembler::new(node_attrs, periodic);
        info!(
            "potential adapter: {} of {} atoms, precision={}, energy={}, periodic={}",
            indices.len(),
            natoms,
            precision,
            energy_kind,
            periodic
        );

        Ok(Self {
            model,
            species,
            precision,
            energy_kind,
            units: options.units,
            natoms,
            indices,
            region_numbers,
            periodic,
            finder,
            assembler,
            ncalls: AtomicUsize::new(0),
        })
    }

    /// Build the model input for host `positions` and optional host box
    /// vectors.
    pub fn build_graph(&self, positions: &[[f64; 3]], box_vectors: Option<[[f64; 3]; 3]>) -> Result<GraphInput> {
        if positions.len() != self.natoms {
            return Err(PotentialError::invalid_region(format!(
                "expected positions of {} atoms, got {}",
                self.natoms,
                positions.len()
            ))
            .into());
        }

        let length_scale = self.units.length_scale();
        let precision = self.precision;
        let positions: Vec<[f64; 3]> = self
            .indices
            .iter()
            .map(|&i| {
                let [x, y, z] = positions[i];
                precision.cast3([x * length_scale, y * length_scale, z * length_scale])
            })
            .collect();
        let cell = match box_vectors {
            Some(vectors) => Some(Cell::new(vectors)?.scaled(length_scale)?.map_values(|x| precision.cast(x))?),
            None => None,
        };

        let pairs = self.finder.find_pairs(&positions, cell.as_ref())?;
        let mut edges = ShiftResolver.resolve(&pairs, &positions, cell.as_ref())?;
        edges.shifts.iter_mut().for_each(|s| *s = precision.cast3(*s));
        if edges.is_empty() {
            warn!("no neighbor pairs within {} Å: all atoms are isolated", self.finder.cutoff());
        }
        debug!("neighbor graph: {} nodes, {} edges", positions.len(), edges.len());

        self.assembler.assemble(positions, edges, cell.as_ref())
    }

    /// Energy in host units for host `positions` and optional box vectors.
    pub fn evaluate(&self, positions: &[[f64; 3]], box_vectors: Option<[[f64; 3]; 3]>) -> Result<f64> {
        let graph = self.build_graph(positions, box_vectors)?;
        let output = self.model.forward(&graph, false)?;
        let energy = output.energy(self.energy_kind)?;
        self.ncalls.fetch_add(1, Ordering::Relaxed);
        trace!("model {}: {} eV", self.energy_kind, energy);

        Ok(self.precision.cast(energy * self.units.energy_scale()))
    }

    /// Return the number of potential evaluations
    pub fn number_of_evaluations(&self) -> usize {
        self.ncalls.load(Ordering::Relaxed)
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn energy_kind(&self) -> EnergyKind {
        self.energy_kind
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn region_numbers(&self) -> &[usize] {
        &self.region_numbers
    }

    pub fn natoms(&self) -> usize {
        self.natoms
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Cutoff radius in model units (Å).
    pub fn cutoff(&self) -> f64 {
        self.finder.cutoff()
    }
}
// c5d81f2e ends here

// [[file:../mace.note::0e63f4ba][0e63f4ba]]
/// Calling convention of a host "external model force": positions and
/// optional box vectors in, energy out, all in host units.
pub trait EnergyEvaluator {
    fn forward(&self, positions: &[[f64; 3]], box_vectors: Option<[[f64; 3]; 3]>) -> Result<f64>;
}

impl EnergyEvaluator for PotentialAdapter {
    fn forward(&self, positions: &[[f64; 3]], box_vectors: Option<[[f64; 3]; 3]>) -> Result<f64> {
        self.evaluate(positions, box_vectors)
    }
}

impl ChemicalModel for PotentialAdapter {
    /// Positions of `mol` are taken in host length units; its lattice, if
    /// any, provides the box vectors.
    fn compute(&mut self, mol: &Molecule) -> Result<Computed> {
        let positions: Vec<[f64; 3]> = mol.positions().collect();
        let box_vectors: Option<[[f64; 3]; 3]> = mol.get_lattice().map(|lat| lat.matrix().into());
        let energy = self.evaluate(&positions, box_vectors)?;

        let mut computed = Computed::default();
        computed.set_energy(energy);
        computed.set_energy_kind(self.energy_kind);
        Ok(computed)
    }
}
// 0e63f4ba ends here

// test:1 ends here

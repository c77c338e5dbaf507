// header

// [[file:../mace.note::*header][header:1]]
//! The Lennard-Jones graph model for test purpose
// header:1 ends here

// imports

// [[file:../mace.note::*imports][imports:1]]
use crate::core::*;
use crate::graph::GraphInput;
use crate::model::{GraphModel, ModelOutput, Precision};

use vecfx::*;
// imports:1 ends here

// core

// [[file:../mace.note::*core][core:1]]
/// Pairwise Lennard-Jones energy evaluated over the edges of a `GraphInput`,
/// plus a fixed isolated-atom energy per species.
#[derive(Clone, Debug)]
pub struct LennardJones {
    /// Energy constant of the Lennard-Jones potential, in eV
    pub epsilon: f64,
    /// Distance constant of the Lennard-Jones potential, in Å
    pub sigma: f64,
    /// Cutoff radius in Å
    pub r_max: f64,
    /// Species table with isolated-atom energies in eV
    pub atomic_energies: Vec<(usize, f64)>,

    precision: Precision,
}

impl Default for LennardJones {
    fn default() -> Self {
        LennardJones {
            epsilon: 0.01,
            sigma: 3.0,
            r_max: 5.0,
            // H, C, N, O
            atomic_energies: vec![(1, -13.57), (6, -1029.86), (7, -1484.94), (8, -2041.84)],
            precision: Precision::Double,
        }
    }
}

impl LennardJones {
    // vij
    fn pair_energy(&self, r: f64) -> f64 {
        let s6 = f64::powi(self.sigma / r, 6);
        4.0 * self.epsilon * (f64::powi(s6, 2) - s6)
    }

    /// Sum of pair energies; each undirected pair appears as two edges.
    fn interaction_energy(&self, input: &GraphInput) -> Result<f64> {
        let positions = &input.positions;
        let mut energy = 0.0;
        for (k, (&s, &t)) in input.edge_index[0].iter().zip(&input.edge_index[1]).enumerate() {
            if s >= positions.len() || t >= positions.len() {
                bail!("edge ({}, {}) is out of range", s, t);
            }
            // the image of the target seen from the source
            let [sx, sy, sz] = input.shifts.get(k).copied().unwrap_or([0.0; 3]);
            let [tx, ty, tz] = positions[t];
            let r = positions[s].vecdist(&[tx - sx, ty - sy, tz - sz]);
            if r <= self.r_max {
                energy += 0.5 * self.pair_energy(r);
            }
        }

        Ok(energy)
    }

    fn self_energy(&self, input: &GraphInput) -> Result<f64> {
        let attrs = &input.node_attrs;
        if attrs.ncols() != self.atomic_energies.len() {
            bail!(
                "node attributes have {} species, model has {}",
                attrs.ncols(),
                self.atomic_energies.len()
            );
        }
        let mut energy = 0.0;
        for i in 0..attrs.nrows() {
            let k = attrs
                .species_index(i)
                .ok_or_else(|| format_err!("node {} has no species", i))?;
            energy += self.atomic_energies[k].1;
        }

        Ok(energy)
    }
}
// core:1 ends here

// entry

// [[file:../mace.note::*entry][entry:1]]
impl GraphModel for LennardJones {
    fn atomic_numbers(&self) -> Vec<usize> {
        self.atomic_energies.iter().map(|&(z, _)| z).collect()
    }

    fn r_max(&self) -> f64 {
        self.r_max
    }

    fn precision(&self) -> Precision {
        self.precision
    }

    fn to_precision(&self, precision: Precision) -> Box<dyn GraphModel> {
        let mut model = self.clone();
        model.precision = precision;
        Box::new(model)
    }

    fn forward(&self, input: &GraphInput, compute_force: bool) -> Result<ModelOutput> {
        if compute_force {
            warn!("LJ graph model: forces are not computed!");
        }
        let e_int = self.precision.cast(self.interaction_energy(input)?);
        let e_self = self.precision.cast(self.self_energy(input)?);

        let mut out = ModelOutput::default();
        out.insert("interaction_energy", Some(e_int));
        out.insert("energy", Some(self.precision.cast(e_int + e_self)));
        Ok(out)
    }
}
// entry:1 ends here

// test

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_lj_graph_model() -> Result<()> {
    use crate::model::EnergyKind;
    use crate::neighbors::NeighborFinder;
    use crate::shifts::ShiftResolver;
    use crate::species::{SpeciesEncoder, SpeciesTable};
    use crate::GraphAssembler;
    use approx::*;

    let lj = LennardJones::default();
    let positions = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 3.0 * 2f64.powf(1.0 / 6.0)]];
    let attrs = SpeciesEncoder::new(SpeciesTable::new(lj.atomic_numbers())).encode(&[8, 1])?;
    let pairs = NeighborFinder::new(lj.r_max())?.find_pairs(&positions, None)?;
    let edges = ShiftResolver.resolve(&pairs, &positions, None)?;
    let graph = GraphAssembler::new(attrs, false).assemble(positions, edges, None)?;

    // dimer at the potential minimum
    let out = lj.forward(&graph, false)?;
    let e_int = out.energy(EnergyKind::InteractionEnergy)?;
    assert_relative_eq!(e_int, -0.01, epsilon = 1e-9);
    let e = out.energy(EnergyKind::Energy)?;
    assert_relative_eq!(e, -0.01 - 2041.84 - 13.57, epsilon = 1e-9);

    Ok(())
}
// test:1 ends here

// [[file:../mace.note::*header][header:1]]
//! Directed edges and periodic shift vectors from neighbor pairs.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::cell::Cell;
use crate::core::*;
use crate::neighbors::NeighborPairs;

use nalgebra::Vector3;
// imports:1 ends here

// [[file:../mace.note::3f8a92c4][3f8a92c4]]
/// Tolerance on the fractional shift before it counts as off-lattice.
const LATTICE_TOLERANCE: f64 = 1e-6;

/// Directed edges of the neighbor graph.
///
/// Row 0 of `edge_index` holds the source atoms, row 1 the targets. For every
/// edge `wrapped + shift` equals `r_target - r_source`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Edges {
    pub edge_index: [Vec<usize>; 2],
    /// minimum-image displacement from source to target
    pub wrapped: Vec<[f64; 3]>,
    /// cartesian lattice translation
    pub shifts: Vec<[f64; 3]>,
    /// the shift in units of lattice vectors
    pub unit_shifts: Vec<[i64; 3]>,
}

impl Edges {
    pub fn len(&self) -> usize {
        self.edge_index[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(source, target)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edge_index[0].iter().copied().zip(self.edge_index[1].iter().copied())
    }
}
// 3f8a92c4 ends here

// [[file:../mace.note::a71d0e53][a71d0e53]]
/// Resolves periodic shifts for symmetrized neighbor pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftResolver;

impl ShiftResolver {
    /// Emit edge `(i, j)` with displacement `d` and edge `(j, i)` with `-d` for
    /// every pair; forward edges come first, then the reversed ones.
    ///
    /// With a cell, the shift of each edge is the lattice translation taking
    /// the wrapped displacement to the true one; without a cell all shifts are
    /// zero.
    pub fn resolve(&self, pairs: &NeighborPairs, positions: &[[f64; 3]], cell: Option<&Cell>) -> Result<Edges> {
        let npairs = pairs.len();
        let mut sources = Vec::with_capacity(2 * npairs);
        let mut targets = Vec::with_capacity(2 * npairs);
        let mut wrapped = Vec::with_capacity(2 * npairs);
        for (&(i, j), d) in pairs.pairs.iter().zip(&pairs.deltas) {
            sources.push(i);
            targets.push(j);
            wrapped.push(*d);
        }
        for (&(i, j), d) in pairs.pairs.iter().zip(&pairs.deltas) {
            sources.push(j);
            targets.push(i);
            wrapped.push([-d[0], -d[1], -d[2]]);
        }

        let nedges = sources.len();
        let (shifts, unit_shifts) = match cell {
            None => (vec![[0.0; 3]; nedges], vec![[0; 3]; nedges]),
            Some(cell) => {
                let mut shifts = Vec::with_capacity(nedges);
                let mut unit_shifts = Vec::with_capacity(nedges);
                for k in 0..nedges {
                    let (s, t) = (sources[k], targets[k]);
                    if s >= positions.len() || t >= positions.len() {
                        bail!("edge ({}, {}) refers to missing atom among {}", s, t, positions.len());
                    }
                    let true_delta = Vector3::from(positions[t]) - Vector3::from(positions[s]);
                    let residual = true_delta - Vector3::from(wrapped[k]);
                    let frac = cell.to_fractional(&residual);
                    let n = frac.map(|x| x.round());
                    if (frac - n).amax() > LATTICE_TOLERANCE {
                        warn!("edge ({}, {}): shift {:?} is off the lattice", s, t, frac);
                    }
                    shifts.push(cell.to_cartesian(&n).into());
                    unit_shifts.push([n.x as i64, n.y as i64, n.z as i64]);
                }
                (shifts, unit_shifts)
            }
        };

        Ok(Edges {
            edge_index: [sources, targets],
            wrapped,
            shifts,
            unit_shifts,
        })
    }
}
// a71d0e53 ends here

// [[file:../mace.note::*test][test:1]]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NeighborFinder;
    use approx::*;

    #[test]
    fn test_shifts_non_periodic() -> Result<()> {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.9]];
        let pairs = NeighborFinder::new(1.0)?.find_pairs(&positions, None)?;
        let edges = ShiftResolver.resolve(&pairs, &positions, None)?;
        assert_eq!(edges.len(), 2);
        assert_eq!(edges.iter().collect::<Vec<_>>(), vec![(0, 1), (1, 0)]);
        assert!(edges.shifts.iter().all(|s| s == &[0.0; 3]));

        Ok(())
    }

    #[test]
    fn test_shifts_periodic() -> Result<()> {
        let cell = Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]])?;
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 9.9]];
        let pairs = NeighborFinder::new(1.0)?.find_pairs(&positions, Some(&cell))?;
        let edges = ShiftResolver.resolve(&pairs, &positions, Some(&cell))?;
        assert_eq!(edges.len(), 2);
        // edge from atom 0 to atom 1
        assert_relative_eq!(edges.wrapped[0][2], -0.1, epsilon = 1e-9);
        assert_relative_eq!(edges.shifts[0][2], 10.0, epsilon = 1e-9);
        assert_eq!(edges.unit_shifts[0], [0, 0, 1]);
        // and back
        assert_eq!(edges.iter().nth(1), Some((1, 0)));
        assert_relative_eq!(edges.shifts[1][2], -10.0, epsilon = 1e-9);

        Ok(())
    }

    #[test]
    fn test_shifts_reconstruct_true_delta() -> Result<()> {
        // unwrapped coordinates far outside the primary cell
        let cell = Cell::new([[5.0, 0.0, 0.0], [1.0, 5.0, 0.0], [0.0, 1.0, 5.0]])?;
        let positions = [[0.2, 0.1, 0.3], [-9.6, 5.4, 15.1], [4.7, 25.2, -4.6], [1.1, -0.3, 0.9]];
        let pairs = NeighborFinder::new(2.0)?.find_pairs(&positions, Some(&cell))?;
        let edges = ShiftResolver.resolve(&pairs, &positions, Some(&cell))?;
        assert_eq!(edges.len(), 2 * pairs.len());
        for (k, (s, t)) in edges.iter().enumerate() {
            for x in 0..3 {
                let true_delta = positions[t][x] - positions[s][x];
                assert_relative_eq!(edges.wrapped[k][x] + edges.shifts[k][x], true_delta, epsilon = 1e-9);
            }
        }
        // reversed edges mirror the forward ones
        let npairs = pairs.len();
        for k in 0..npairs {
            let (i, j) = edges.iter().nth(k).unwrap();
            assert_eq!(edges.iter().nth(k + npairs), Some((j, i)));
            for x in 0..3 {
                assert_eq!(edges.wrapped[k + npairs][x], -edges.wrapped[k][x]);
            }
        }

        Ok(())
    }

    #[test]
    fn test_shifts_no_neighbors() -> Result<()> {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 3.0]];
        let pairs = NeighborFinder::new(1.0)?.find_pairs(&positions, None)?;
        let edges = ShiftResolver.resolve(&pairs, &positions, None)?;
        assert!(edges.is_empty());

        Ok(())
    }
}
// test:1 ends here

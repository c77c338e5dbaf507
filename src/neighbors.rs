// [[file:../mace.note::*header][header:1]]
//! Neighbor pair search within a cutoff radius, with minimum-image
//! displacements for periodic cells.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::cell::Cell;
use crate::core::*;
use crate::error::PotentialError;

use nalgebra::Vector3;
use std::collections::HashMap;
// imports:1 ends here

// [[file:../mace.note::5a0c3e19][5a0c3e19]]
/// Regions up to this size are scanned pair by pair.
const BRUTE_FORCE_THRESHOLD: usize = 256;

/// Periodic binning is skipped when there are more bins than this per atom.
const MAX_BINS_PER_ATOM: usize = 8;

/// Sentinel index marking unused slots of padded output.
pub const PAIR_SENTINEL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Choose by region size.
    Auto,
    BruteForce,
    CellList,
}

/// Unordered neighbor pairs `(i, j)` with `i < j`, and the wrapped
/// displacement `r_j - r_i` of each pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborPairs {
    pub pairs: Vec<(usize, usize)>,
    pub deltas: Vec<[f64; 3]>,
}

impl NeighborPairs {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pair distances computed from the wrapped displacements.
    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.deltas.iter().map(|d| Vector3::from(*d).norm())
    }

    /// Fixed-capacity view with unused slots set to `PAIR_SENTINEL` and NaN
    /// displacements.
    pub fn padded(&self, capacity: usize) -> Result<PaddedPairs> {
        let n = self.len();
        if n > capacity {
            return Err(PotentialError::TooManyPairs { found: n, capacity }.into());
        }
        let mut first = vec![PAIR_SENTINEL; capacity];
        let mut second = vec![PAIR_SENTINEL; capacity];
        let mut deltas = vec![[f64::NAN; 3]; capacity];
        for (k, &(i, j)) in self.pairs.iter().enumerate() {
            first[k] = i as i64;
            second[k] = j as i64;
            deltas[k] = self.deltas[k];
        }

        Ok(PaddedPairs { first, second, deltas })
    }
}

/// Padded neighbor output for fixed-shape consumers.
#[derive(Debug, Clone)]
pub struct PaddedPairs {
    pub first: Vec<i64>,
    pub second: Vec<i64>,
    pub deltas: Vec<[f64; 3]>,
}

impl PaddedPairs {
    /// Drop sentinel slots.
    pub fn compact(&self) -> NeighborPairs {
        let mut found = NeighborPairs::default();
        for k in 0..self.first.len() {
            let (i, j) = (self.first[k], self.second[k]);
            if i >= 0 && j >= 0 {
                found.pairs.push((i as usize, j as usize));
                found.deltas.push(self.deltas[k]);
            }
        }
        found
    }
}
// 5a0c3e19 ends here

// [[file:../mace.note::e2b4d7a1][e2b4d7a1]]
#[derive(Debug, Clone)]
pub struct NeighborFinder {
    cutoff: f64,
    max_pairs: Option<usize>,
    strategy: SearchStrategy,
}

impl NeighborFinder {
    /// Construct a finder for pairs within `cutoff`. Non-positive or non-finite
    /// cutoffs are rejected.
    pub fn new(cutoff: f64) -> Result<Self> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(PotentialError::InvalidCutoff {
                cutoff,
                reason: "cutoff radius must be positive and finite".into(),
            }
            .into());
        }
        Ok(Self {
            cutoff,
            max_pairs: None,
            strategy: SearchStrategy::Auto,
        })
    }

    /// Limit the number of pairs; exceeding it is an error.
    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = Some(max_pairs);
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Find all pairs `i != j` whose (minimum-image) distance is within the
    /// cutoff. Pairs are reported once, ordered by `(i, j)`.
    pub fn find_pairs(&self, positions: &[[f64; 3]], cell: Option<&Cell>) -> Result<NeighborPairs> {
        if let Some(cell) = cell {
            let narrowest = cell.perpendicular_widths().iter().fold(f64::INFINITY, |a, &w| a.min(w));
            if 2.0 * self.cutoff > narrowest {
                return Err(PotentialError::InvalidCutoff {
                    cutoff: self.cutoff,
                    reason: format!("cutoff exceeds half of the narrowest cell width {}", narrowest),
                }
                .into());
            }
        }

        let points: Vec<Vector3<f64>> = positions.iter().map(|&p| p.into()).collect();
        let use_bins = match self.strategy {
            SearchStrategy::BruteForce => false,
            SearchStrategy::CellList => true,
            SearchStrategy::Auto => points.len() > BRUTE_FORCE_THRESHOLD,
        };
        let mut found = if use_bins {
            match cell {
                Some(cell) => self.search_periodic_bins(&points, cell),
                None => self.search_bins(&points),
            }
        } else {
            self.search_all_pairs(&points, cell)
        };
        found.sort_unstable_by_key(|&(pair, _)| pair);
        trace!("found {} neighbor pairs among {} atoms", found.len(), points.len());

        if let Some(capacity) = self.max_pairs {
            if found.len() > capacity {
                return Err(PotentialError::TooManyPairs {
                    found: found.len(),
                    capacity,
                }
                .into());
            }
        }

        let (pairs, deltas) = found.into_iter().unzip();
        Ok(NeighborPairs { pairs, deltas })
    }

    // wrapped displacement from i to j, if within cutoff
    fn check_pair(&self, pi: &Vector3<f64>, pj: &Vector3<f64>, cell: Option<&Cell>) -> Option<[f64; 3]> {
        let d = pj - pi;
        let d = match cell {
            Some(cell) => cell.minimum_image(&d),
            None => d,
        };
        if d.norm_squared() <= self.cutoff * self.cutoff {
            Some(d.into())
        } else {
            None
        }
    }

    fn search_all_pairs(&self, points: &[Vector3<f64>], cell: Option<&Cell>) -> Vec<((usize, usize), [f64; 3])> {
        let n = points.len();
        (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                (i + 1..n).filter_map(move |j| self.check_pair(&points[i], &points[j], cell).map(|d| ((i, j), d)))
            })
            .collect()
    }

    // cubic bins of edge `cutoff` over the bounding box
    fn search_bins(&self, points: &[Vector3<f64>]) -> Vec<((usize, usize), [f64; 3])> {
        let lower = points.iter().fold(Vector3::repeat(f64::INFINITY), |acc, p| acc.inf(p));
        let bin_of = |p: &Vector3<f64>| -> [i64; 3] {
            let b = (p - lower) / self.cutoff;
            [b.x.floor() as i64, b.y.floor() as i64, b.z.floor() as i64]
        };
        let mut bins: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            bins.entry(bin_of(p)).or_insert_with(Vec::new).push(i);
        }

        let bins = &bins;
        (0..points.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let [bx, by, bz] = bin_of(&points[i]);
                let mut found = vec![];
                for (dx, dy, dz) in neighbor_offsets() {
                    if let Some(members) = bins.get(&[bx + dx, by + dy, bz + dz]) {
                        for &j in members.iter().filter(|&&j| j > i) {
                            if let Some(d) = self.check_pair(&points[i], &points[j], None) {
                                found.push(((i, j), d));
                            }
                        }
                    }
                }
                found
            })
            .collect()
    }

    // bins along the fractional axes, wrapped periodically. Falls back to the
    // full scan when an axis has fewer than three bins, or when empty bins
    // would far outnumber the atoms.
    fn search_periodic_bins(&self, points: &[Vector3<f64>], cell: &Cell) -> Vec<((usize, usize), [f64; 3])> {
        let widths = cell.perpendicular_widths();
        let nb = widths.map(|w| (w / self.cutoff).floor() as i64);
        if nb.iter().any(|&n| n < 3) {
            debug!("cell too small for binning ({:?} bins), scanning all pairs", nb);
            return self.search_all_pairs(points, Some(cell));
        }
        let nbins = nb.iter().fold(1f64, |acc, &n| acc * n as f64);
        if nbins > (MAX_BINS_PER_ATOM * points.len().max(1)) as f64 {
            debug!("{} bins for {} atoms is too sparse, scanning all pairs", nbins, points.len());
            return self.search_all_pairs(points, Some(cell));
        }

        let bin_of = |p: &Vector3<f64>| -> [i64; 3] {
            let f = cell.to_fractional(p);
            let mut b = [0; 3];
            for k in 0..3 {
                let u = f[k] - f[k].floor();
                b[k] = ((u * nb[k] as f64) as i64).min(nb[k] - 1);
            }
            b
        };
        let linear = |b: [i64; 3]| -> usize { (b[0] + nb[0] * (b[1] + nb[1] * b[2])) as usize };
        let mut bins: Vec<Vec<usize>> = vec![vec![]; (nb[0] * nb[1] * nb[2]) as usize];
        for (i, p) in points.iter().enumerate() {
            bins[linear(bin_of(p))].push(i);
        }

        let bins = &bins;
        (0..points.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let [bx, by, bz] = bin_of(&points[i]);
                let mut found = vec![];
                for (dx, dy, dz) in neighbor_offsets() {
                    let b = [
                        (bx + dx).rem_euclid(nb[0]),
                        (by + dy).rem_euclid(nb[1]),
                        (bz + dz).rem_euclid(nb[2]),
                    ];
                    for &j in bins[linear(b)].iter().filter(|&&j| j > i) {
                        if let Some(d) = self.check_pair(&points[i], &points[j], Some(cell)) {
                            found.push(((i, j), d));
                        }
                    }
                }
                found
            })
            .collect()
    }
}

fn neighbor_offsets() -> impl Iterator<Item = (i64, i64, i64)> {
    (-1..=1).flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
}
// e2b4d7a1 ends here

// [[file:../mace.note::*test][test:1]]
#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use vecfx::*;

    // deterministic scatter of points inside a box
    fn scattered_positions(n: usize, side: f64) -> Vec<[f64; 3]> {
        let mut rng = StdRng::seed_from_u64(12345);
        (0..n)
            .map(|_| [rng.gen_range(0.0..side), rng.gen_range(0.0..side), rng.gen_range(0.0..side)])
            .collect()
    }

    #[test]
    fn test_pairs_non_periodic() -> Result<()> {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.9], [0.0, 0.0, 2.5]];
        let finder = NeighborFinder::new(1.0)?;
        let found = finder.find_pairs(&positions, None)?;
        assert_eq!(found.pairs, vec![(0, 1)]);
        assert_relative_eq!(found.deltas[0][2], 0.9, epsilon = 1e-12);

        Ok(())
    }

    #[test]
    fn test_pairs_periodic_minimum_image() -> Result<()> {
        let cell = Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]])?;
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 9.9]];
        let finder = NeighborFinder::new(1.0)?;
        let found = finder.find_pairs(&positions, Some(&cell))?;
        assert_eq!(found.pairs, vec![(0, 1)]);
        assert_relative_eq!(found.deltas[0][2], -0.1, epsilon = 1e-9);

        // without the cell the atoms are far apart
        assert!(finder.find_pairs(&positions, None)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_pairs_within_cutoff() -> Result<()> {
        let positions = scattered_positions(80, 6.0);
        let cutoff = 1.5;
        let found = NeighborFinder::new(cutoff)?.find_pairs(&positions, None)?;
        for (&(i, j), r) in found.pairs.iter().zip(found.distances()) {
            assert!(i < j);
            assert!(r <= cutoff);
            assert_relative_eq!(r, positions[i].vecdist(&positions[j]), epsilon = 1e-12);
        }
        // every pair within cutoff is reported
        let n = positions.len();
        let expected = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| positions[i].vecdist(&positions[j]) <= cutoff)
            .count();
        assert_eq!(found.len(), expected);

        Ok(())
    }

    #[test]
    fn test_search_strategies_agree() -> Result<()> {
        let positions = scattered_positions(300, 12.0);
        let brute = NeighborFinder::new(2.0)?.with_strategy(SearchStrategy::BruteForce);
        let binned = NeighborFinder::new(2.0)?.with_strategy(SearchStrategy::CellList);
        assert_eq!(brute.find_pairs(&positions, None)?.pairs, binned.find_pairs(&positions, None)?.pairs);

        let cell = Cell::new([[12.0, 0.0, 0.0], [2.0, 12.0, 0.0], [1.0, -1.0, 12.0]])?;
        let a = brute.find_pairs(&positions, Some(&cell))?;
        let b = binned.find_pairs(&positions, Some(&cell))?;
        assert_eq!(a.pairs, b.pairs);
        assert!(a.len() > 0);

        Ok(())
    }

    #[test]
    fn test_sparse_periodic_cell() -> Result<()> {
        // 300 bins per axis for 300 atoms; the binned search must not build them
        let side = 1500.0;
        let cell = Cell::new([[side, 0.0, 0.0], [0.0, side, 0.0], [0.0, 0.0, side]])?;
        let mut positions = scattered_positions(298, side);
        positions.push([0.5, 0.5, 0.5]);
        positions.push([side - 0.5, 0.5, 0.5]);

        let brute = NeighborFinder::new(5.0)?.with_strategy(SearchStrategy::BruteForce);
        let auto = NeighborFinder::new(5.0)?;
        let a = brute.find_pairs(&positions, Some(&cell))?;
        let b = auto.find_pairs(&positions, Some(&cell))?;
        assert_eq!(a, b);
        assert!(a.pairs.contains(&(298, 299)));

        Ok(())
    }

    #[test]
    fn test_padded_pairs() -> Result<()> {
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.9], [0.0, 0.8, 0.0]];
        let found = NeighborFinder::new(1.0)?.find_pairs(&positions, None)?;
        assert_eq!(found.len(), 2);
        let padded = found.padded(5)?;
        assert_eq!(padded.first, vec![0, 0, -1, -1, -1]);
        assert_eq!(padded.compact(), found);
        assert!(found.padded(1).is_err());

        Ok(())
    }

    #[test]
    fn test_invalid_cutoff() -> Result<()> {
        assert!(NeighborFinder::new(0.0).is_err());
        assert!(NeighborFinder::new(-1.0).is_err());

        let cell = Cell::new([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]])?;
        let err = NeighborFinder::new(2.0)?.find_pairs(&[[0.0; 3]], Some(&cell)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PotentialError>(),
            Some(PotentialError::InvalidCutoff { .. })
        ));

        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, 0.5], [0.0, 0.5, 0.0]];
        let err = NeighborFinder::new(1.0)?.with_max_pairs(2).find_pairs(&positions, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PotentialError>(),
            Some(PotentialError::TooManyPairs { found: 3, capacity: 2 })
        ));

        Ok(())
    }
}
// test:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::core::*;
use crate::error::PotentialError;

use serde::{Deserialize, Serialize};
// imports:1 ends here

// [[file:../mace.note::4c1e0a7d][4c1e0a7d]]
/// Ordered set of atomic numbers a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesTable {
    numbers: Vec<usize>,
}

impl SpeciesTable {
    /// Construct from the model's atomic numbers. Order is preserved, repeated
    /// numbers are dropped.
    pub fn new(numbers: impl IntoIterator<Item = usize>) -> Self {
        let mut table: Vec<usize> = vec![];
        for z in numbers {
            if !table.contains(&z) {
                table.push(z);
            }
        }
        Self { numbers: table }
    }

    /// The number of distinct species, i.e. the width of one-hot rows.
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers(&self) -> &[usize] {
        &self.numbers
    }

    /// Column index of atomic number `z`.
    pub fn index_of(&self, z: usize) -> Result<usize> {
        match self.numbers.iter().position(|&x| x == z) {
            Some(i) => Ok(i),
            None => Err(PotentialError::UnknownSpecies {
                number: z,
                table: self.numbers.clone(),
            }
            .into()),
        }
    }
}
// 4c1e0a7d ends here

// [[file:../mace.note::9d2f61b0][9d2f61b0]]
/// One-hot node features: one row per active atom, one column per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    ncols: usize,
    data: Vec<f64>,
}

impl NodeAttributes {
    pub fn nrows(&self) -> usize {
        if self.ncols == 0 {
            0
        } else {
            self.data.len() / self.ncols
        }
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.ncols.max(1))
    }

    /// Column index holding the 1 in row `i`.
    pub fn species_index(&self, i: usize) -> Option<usize> {
        self.row(i).iter().position(|&x| x == 1.0)
    }

    pub(crate) fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            ncols: self.ncols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }
}

/// Encodes atomic numbers against a fixed species table.
#[derive(Debug, Clone)]
pub struct SpeciesEncoder {
    table: SpeciesTable,
}

impl SpeciesEncoder {
    pub fn new(table: SpeciesTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SpeciesTable {
        &self.table
    }

    /// One-hot encode `numbers`. Fails on the first atomic number missing from
    /// the table; unknown atoms are never skipped.
    pub fn encode(&self, numbers: &[usize]) -> Result<NodeAttributes> {
        let ncols = self.table.len();
        let mut data = vec![0.0; numbers.len() * ncols];
        for (i, &z) in numbers.iter().enumerate() {
            let k = self.table.index_of(z)?;
            data[i * ncols + k] = 1.0;
        }
        trace!("encoded {} atoms over {} species", numbers.len(), ncols);

        Ok(NodeAttributes { ncols, data })
    }
}
// 9d2f61b0 ends here

// [[file:../mace.note::*test][test:1]]
#[test]
fn test_species_encoder() -> Result<()> {
    let table = SpeciesTable::new(vec![1, 6, 7, 8, 6]);
    assert_eq!(table.numbers(), &[1, 6, 7, 8]);

    let encoder = SpeciesEncoder::new(table);
    let attrs = encoder.encode(&[8, 1, 1])?;
    assert_eq!(attrs.nrows(), 3);
    assert_eq!(attrs.ncols(), 4);
    assert_eq!(attrs.row(0), &[0.0, 0.0, 0.0, 1.0]);
    assert_eq!(attrs.species_index(1), Some(0));
    for row in attrs.rows() {
        assert_eq!(row.iter().sum::<f64>(), 1.0);
    }

    Ok(())
}

#[test]
fn test_species_encoder_unknown() {
    let encoder = SpeciesEncoder::new(SpeciesTable::new(vec![1, 8]));
    let err = encoder.encode(&[8, 26, 1]).unwrap_err();
    match err.downcast_ref::<PotentialError>() {
        Some(PotentialError::UnknownSpecies { number, .. }) => assert_eq!(*number, 26),
        other => panic!("unexpected error: {:?}", other),
    }
}
// test:1 ends here

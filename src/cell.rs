// [[file:../mace.note::*header][header:1]]
//! Periodic simulation cell.
//!
//! Rows of the cell matrix are the three lattice vectors, matching the box
//! vector layout used by hosts. Cartesian row vectors `r` map to fractional
//! coordinates `f` through `r = f · H`.
// header:1 ends here

// [[file:../mace.note::*imports][imports:1]]
use crate::core::*;
use crate::error::PotentialError;

use nalgebra::{Matrix3, Vector3};
// imports:1 ends here

// [[file:../mace.note::0b7e55c2][0b7e55c2]]
const SINGULAR_VOLUME_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// lattice vectors as rows
    h: Matrix3<f64>,
    /// inverse of `h`
    h_inv: Matrix3<f64>,
}

impl Cell {
    /// Construct from three lattice vectors. Fails with `InvalidCell` when the
    /// vectors are not finite or span no volume.
    pub fn new(vectors: [[f64; 3]; 3]) -> Result<Self> {
        if vectors.iter().flatten().any(|x| !x.is_finite()) {
            return Err(PotentialError::invalid_cell(format!("non-finite cell vectors: {:?}", vectors)).into());
        }
        let [a, b, c] = vectors;
        let h = Matrix3::new(a[0], a[1], a[2], b[0], b[1], b[2], c[0], c[1], c[2]);
        let volume = h.determinant().abs();
        let scale = h.row(0).norm() * h.row(1).norm() * h.row(2).norm();
        if volume <= SINGULAR_VOLUME_EPS * scale.max(1.0) {
            return Err(PotentialError::invalid_cell(format!("singular cell vectors: {:?}", vectors)).into());
        }
        let h_inv = h
            .try_inverse()
            .ok_or_else(|| PotentialError::invalid_cell(format!("cell is not invertible: {:?}", vectors)))?;

        Ok(Self { h, h_inv })
    }

    /// Lattice vectors as rows.
    pub fn vectors(&self) -> [[f64; 3]; 3] {
        let mut vectors = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                vectors[i][j] = self.h[(i, j)];
            }
        }
        vectors
    }

    pub fn volume(&self) -> f64 {
        self.h.determinant().abs()
    }

    /// Return a new cell with every vector multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        let mut vectors = self.vectors();
        vectors.iter_mut().flatten().for_each(|x| *x *= factor);
        Self::new(vectors)
    }

    /// Apply `f` to every matrix element, e.g. for precision rounding.
    pub(crate) fn map_values(&self, f: impl Fn(f64) -> f64) -> Result<Self> {
        let mut vectors = self.vectors();
        vectors.iter_mut().flatten().for_each(|x| *x = f(*x));
        Self::new(vectors)
    }

    pub fn to_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.h_inv.transpose() * r
    }

    pub fn to_cartesian(&self, f: &Vector3<f64>) -> Vector3<f64> {
        self.h.transpose() * f
    }

    /// Distances between opposite faces of the cell.
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        let a: Vector3<f64> = self.h.row(0).transpose();
        let b: Vector3<f64> = self.h.row(1).transpose();
        let c: Vector3<f64> = self.h.row(2).transpose();
        let volume = self.volume();
        Vector3::new(
            volume / b.cross(&c).norm(),
            volume / c.cross(&a).norm(),
            volume / a.cross(&b).norm(),
        )
    }

    /// Minimum image of displacement `d`: every fractional component is
    /// wrapped into [-0.5, 0.5).
    pub fn minimum_image(&self, d: &Vector3<f64>) -> Vector3<f64> {
        let mut f = self.to_fractional(d);
        for k in 0..3 {
            f[k] -= (f[k] + 0.5).floor();
        }
        self.to_cartesian(&f)
    }
}
// 0b7e55c2 ends here

// [[file:../mace.note::*test][test:1]]
#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn test_cell_minimum_image() -> Result<()> {
        let cell = Cell::new([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]])?;
        let d = cell.minimum_image(&Vector3::new(0.0, 0.0, 9.9));
        assert_relative_eq!(d.z, -0.1, epsilon = 1e-9);
        let d = cell.minimum_image(&Vector3::new(-14.0, 26.0, 0.2));
        assert_relative_eq!(d.x, -4.0, epsilon = 1e-9);
        assert_relative_eq!(d.y, -4.0, epsilon = 1e-9);
        assert_relative_eq!(d.z, 0.2, epsilon = 1e-9);

        Ok(())
    }

    #[test]
    fn test_cell_triclinic() -> Result<()> {
        let cell = Cell::new([[4.0, 0.0, 0.0], [1.0, 5.0, 0.0], [0.5, 0.5, 6.0]])?;
        let r = Vector3::new(1.2, -3.4, 7.7);
        let back = cell.to_cartesian(&cell.to_fractional(&r));
        assert_relative_eq!(back, r, epsilon = 1e-9);

        let widths = cell.perpendicular_widths();
        assert_relative_eq!(widths.z, 6.0, epsilon = 1e-9);
        assert_relative_eq!(cell.volume(), 120.0, epsilon = 1e-9);

        Ok(())
    }

    #[test]
    fn test_cell_singular() {
        let err = Cell::new([[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PotentialError>(),
            Some(PotentialError::InvalidCell { .. })
        ));
    }
}
// test:1 ends here

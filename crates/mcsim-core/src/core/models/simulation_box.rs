use super::space::SpaceError;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationBox {
    lengths: Vector3<f64>,
}

impl SimulationBox {
    /// Creates a periodic cell from its edge lengths.
    ///
    /// Only three-dimensional cells are supported; every edge must be positive and finite.
    pub fn new(lengths: &[f64]) -> Result<Self, SpaceError> {
        if lengths.len() != 3 {
            return Err(SpaceError::UnsupportedDimension(lengths.len()));
        }
        if let Some(&bad) = lengths.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(SpaceError::InvalidLength(bad));
        }
        Ok(Self {
            lengths: Vector3::new(lengths[0], lengths[1], lengths[2]),
        })
    }

    pub fn cubic(length: f64) -> Result<Self, SpaceError> {
        Self::new(&[length, length, length])
    }

    #[inline]
    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    #[inline]
    pub fn min_length(&self) -> f64 {
        self.lengths.min()
    }

    /// Shortest periodic image of a displacement vector.
    #[inline]
    pub fn minimum_image(&self, d: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            d.x - self.lengths.x * (d.x / self.lengths.x).round(),
            d.y - self.lengths.y * (d.y / self.lengths.y).round(),
            d.z - self.lengths.z * (d.z / self.lengths.z).round(),
        )
    }

    /// Maps a point into `[0, L)` along every axis.
    #[inline]
    pub fn wrap(&self, p: &Point3<f64>) -> Point3<f64> {
        let mut wrapped = *p;
        for axis in 0..3 {
            let l = self.lengths[axis];
            let mut c = p[axis] - l * (p[axis] / l).floor();
            if c >= l {
                c -= l;
            }
            wrapped[axis] = c;
        }
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn new_rejects_non_three_dimensional_cells() {
        assert_eq!(
            SimulationBox::new(&[1.0, 2.0]),
            Err(SpaceError::UnsupportedDimension(2))
        );
    }

    #[test]
    fn new_rejects_non_positive_lengths() {
        assert_eq!(
            SimulationBox::new(&[1.0, 0.0, 2.0]),
            Err(SpaceError::InvalidLength(0.0))
        );
    }

    #[test]
    fn volume_and_min_length_for_orthorhombic_cell() {
        let b = SimulationBox::new(&[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(b.volume(), 24.0);
        assert_eq!(b.min_length(), 2.0);
    }

    #[test]
    fn minimum_image_folds_long_displacements() {
        let b = SimulationBox::cubic(10.0).unwrap();
        let d = b.minimum_image(&Vector3::new(9.0, -6.0, 4.0));
        assert!((d - Vector3::new(-1.0, 4.0, 4.0)).norm() < TOLERANCE);
    }

    #[test]
    fn wrap_maps_points_into_the_cell() {
        let b = SimulationBox::cubic(10.0).unwrap();
        let p = b.wrap(&Point3::new(-0.5, 10.0, 23.0));
        assert!((p - Point3::new(9.5, 0.0, 3.0)).norm() < TOLERANCE);
        assert!(p.iter().all(|c| (0.0..10.0).contains(c)));
    }
}

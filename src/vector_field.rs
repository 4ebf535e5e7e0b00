// src/vector_field.rs

use crate::error::Result;
use crate::scalar_field::ScalarField3D;

use rayon::prelude::*;

/// Three scalar fields of identical shape: the x, y, z components of a vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField3D {
    pub x: ScalarField3D,
    pub y: ScalarField3D,
    pub z: ScalarField3D,
}

impl VectorField3D {
    /// Bundle three components. Fails with `ShapeMismatch` if their shapes differ.
    pub fn new(x: ScalarField3D, y: ScalarField3D, z: ScalarField3D) -> Result<Self> {
        x.ensure_same_shape(&y)?;
        x.ensure_same_shape(&z)?;
        Ok(Self { x, y, z })
    }

    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            x: ScalarField3D::zeros(nx, ny, nz),
            y: ScalarField3D::zeros(nx, ny, nz),
            z: ScalarField3D::zeros(nx, ny, nz),
        }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.x.shape()
    }

    pub fn into_components(self) -> [ScalarField3D; 3] {
        [self.x, self.y, self.z]
    }

    /// Componentwise Σ v * dvol (e.g. total moment of a density).
    pub fn integrate(&self, dvol: f64) -> [f64; 3] {
        [
            self.x.sum() * dvol,
            self.y.sum() * dvol,
            self.z.sum() * dvol,
        ]
    }

    /// Apply the 3x3 matrix `r` pointwise: out_a = Σ_b r[a][b] * v_b.
    pub fn rotated(&self, r: &[[f64; 3]; 3]) -> Self {
        let [nx, ny, nz] = self.shape();
        let mut out = Self::zeros(nx, ny, nz);
        let (vx, vy, vz) = (&self.x.data, &self.y.data, &self.z.data);

        let outs = [&mut out.x.data, &mut out.y.data, &mut out.z.data];
        outs.into_par_iter().enumerate().for_each(|(a, dst)| {
            let row = r[a];
            for (n, d) in dst.iter_mut().enumerate() {
                *d = row[0] * vx[n] + row[1] * vy[n] + row[2] * vz[n];
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VecPotError;

    #[test]
    fn new_rejects_mismatched_components() {
        let a = ScalarField3D::zeros(4, 4, 4);
        let b = ScalarField3D::zeros(4, 4, 4);
        let c = ScalarField3D::zeros(5, 4, 4);
        let err = VectorField3D::new(a, b, c).unwrap_err();
        assert!(matches!(err, VecPotError::ShapeMismatch { .. }));
    }

    #[test]
    fn rotation_permutes_components() {
        let mut v = VectorField3D::zeros(2, 2, 2);
        v.x.data.fill(1.0);
        v.y.data.fill(2.0);
        v.z.data.fill(3.0);

        // Cyclic permutation x->y->z->x
        let r = [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let w = v.rotated(&r);
        assert!(w.x.data.iter().all(|&s| s == 3.0));
        assert!(w.y.data.iter().all(|&s| s == 1.0));
        assert!(w.z.data.iter().all(|&s| s == 2.0));

        let total = w.integrate(0.5);
        assert!((total[0] - 12.0).abs() < 1e-12);
    }
}

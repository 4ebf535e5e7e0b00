// src/scalar_field.rs

use crate::error::{Result, VecPotError};
use crate::grid::idx3;

/// Real samples on an nx × ny × nz lattice, i fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub data: Vec<f64>,
}

impl ScalarField3D {
    /// All-zero field of the given shape.
    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            data: vec![0.0; nx * ny * nz],
        }
    }

    /// Zero field with the same shape as `other`.
    pub fn zeros_like(other: &ScalarField3D) -> Self {
        Self::zeros(other.nx, other.ny, other.nz)
    }

    /// Wrap an existing buffer; its length must be nx*ny*nz.
    pub fn from_vec(nx: usize, ny: usize, nz: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != nx * ny * nz {
            return Err(VecPotError::InvalidGridGeometry(format!(
                "field buffer has {} samples, expected {}x{}x{} = {}",
                data.len(),
                nx,
                ny,
                nz,
                nx * ny * nz
            )));
        }
        Ok(Self { nx, ny, nz, data })
    }

    /// Sample `f(i, j, k)` at every lattice point.
    pub fn from_fn<F>(nx: usize, ny: usize, nz: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(f(i, j, k));
                }
            }
        }
        Self { nx, ny, nz, data }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        idx3(i, j, k, self.nx, self.ny)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.idx(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, v: f64) {
        let id = self.idx(i, j, k);
        self.data[id] = v;
    }

    /// `Err(ShapeMismatch)` unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &ScalarField3D) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(VecPotError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// (i, j, k) of the first NaN or infinite sample in storage order.
    pub fn first_non_finite(&self) -> Option<[usize; 3]> {
        let n = self.data.iter().position(|v| !v.is_finite())?;
        Some([n % self.nx, (n / self.nx) % self.ny, n / (self.nx * self.ny)])
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0f64, |m, v| m.max(v.abs()))
    }

    /// Multiply every sample by `s` in place.
    pub fn scale_mut(&mut self, s: f64) {
        for v in &mut self.data {
            *v *= s;
        }
    }

    /// Max |self - other| over all samples (shapes must agree).
    pub fn max_abs_diff(&self, other: &ScalarField3D) -> f64 {
        debug_assert_eq!(self.shape(), other.shape());
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()))
    }
}

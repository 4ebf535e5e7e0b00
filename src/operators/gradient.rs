// src/operators/gradient.rs
//
// Finite-difference partial derivatives of a scalar field on a uniform grid.
//
//   interior:  (f[p+1] - f[p-1]) / (2h)     second order
//   edges:     (f[1] - f[0]) / h,  (f[n-1] - f[n-2]) / h     first order, one-sided
//
// Same convention as the usual "gradient" helpers in array libraries (edge order 1).

use crate::error::{Result, VecPotError};
use crate::scalar_field::ScalarField3D;

use rayon::prelude::*;

/// Partial derivative of `f` along `axis` (0 = x, 1 = y, 2 = z) with sample spacing `h`.
pub fn partial_derivative(f: &ScalarField3D, axis: usize, h: f64) -> Result<ScalarField3D> {
    if axis > 2 {
        return Err(VecPotError::InvalidGridGeometry(format!(
            "axis index out of range: {}",
            axis
        )));
    }
    check_spacing(axis, h)?;

    let [nx, ny, nz] = f.shape();
    let n_axis = f.shape()[axis];
    if n_axis < 2 {
        return Err(VecPotError::InsufficientGridSize { axis, len: n_axis });
    }

    let stride = match axis {
        0 => 1,
        1 => nx,
        _ => nx * ny,
    };
    let inv_h = 1.0 / h;
    let inv_2h = 0.5 / h;
    let src: &[f64] = &f.data;

    let mut out = ScalarField3D::zeros(nx, ny, nz);
    if nx == 0 || ny == 0 || nz == 0 {
        return Ok(out);
    }

    // Parallelise over contiguous x-rows.
    out.data
        .par_chunks_mut(nx)
        .enumerate()
        .for_each(|(row_idx, row)| {
            let k = row_idx / ny;
            let j = row_idx % ny;
            let base = row_idx * nx;
            for (i, d) in row.iter_mut().enumerate() {
                let p = match axis {
                    0 => i,
                    1 => j,
                    _ => k,
                };
                let id = base + i;
                *d = if p == 0 {
                    (src[id + stride] - src[id]) * inv_h
                } else if p + 1 == n_axis {
                    (src[id] - src[id - stride]) * inv_h
                } else {
                    (src[id + stride] - src[id - stride]) * inv_2h
                };
            }
        });

    Ok(out)
}

/// All three partial derivatives (d/dx, d/dy, d/dz).
///
/// Every axis needs at least two samples; spacings must be positive.
pub fn gradient(f: &ScalarField3D, spacing: [f64; 3]) -> Result<[ScalarField3D; 3]> {
    // Validate all axes before differentiating any.
    for (axis, &h) in spacing.iter().enumerate() {
        check_spacing(axis, h)?;
        let len = f.shape()[axis];
        if len < 2 {
            return Err(VecPotError::InsufficientGridSize { axis, len });
        }
    }

    Ok([
        partial_derivative(f, 0, spacing[0])?,
        partial_derivative(f, 1, spacing[1])?,
        partial_derivative(f, 2, spacing[2])?,
    ])
}

fn check_spacing(axis: usize, h: f64) -> Result<()> {
    if !(h > 0.0) || !h.is_finite() {
        return Err(VecPotError::InvalidGridGeometry(format!(
            "spacing along axis {} must be positive, got {}",
            axis, h
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_field_has_exact_constant_gradient() {
        let h = 0.3;
        let f = ScalarField3D::from_fn(5, 4, 3, |i, j, k| {
            2.0 * (i as f64 * h) - 1.5 * (j as f64 * h) + 0.5 * (k as f64 * h)
        });
        let [gx, gy, gz] = gradient(&f, [h, h, h]).unwrap();
        for n in 0..f.data.len() {
            assert!((gx.data[n] - 2.0).abs() < 1e-12);
            assert!((gy.data[n] + 1.5).abs() < 1e-12);
            assert!((gz.data[n] - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn quadratic_field_uses_central_interior_and_one_sided_edges() {
        // f = x^2 along x; central differences are exact for quadratics in the interior.
        let h = 0.5;
        let f = ScalarField3D::from_fn(5, 2, 2, |i, _, _| (i as f64 * h).powi(2));
        let gx = partial_derivative(&f, 0, h).unwrap();

        for i in 1..4 {
            let x = i as f64 * h;
            assert!((gx.get(i, 1, 1) - 2.0 * x).abs() < 1e-12);
        }
        // Edges: forward / backward first-order differences.
        assert!((gx.get(0, 0, 0) - (0.25 - 0.0) / h).abs() < 1e-12);
        assert!((gx.get(4, 0, 0) - (4.0 - 2.25) / h).abs() < 1e-12);
    }

    #[test]
    fn two_samples_give_a_single_difference() {
        let f = ScalarField3D::from_fn(2, 2, 2, |_, _, k| 3.0 * k as f64);
        let gz = partial_derivative(&f, 2, 0.5).unwrap();
        assert!(gz.data.iter().all(|&v| (v - 6.0).abs() < 1e-12));
    }

    #[test]
    fn single_sample_axis_is_rejected() {
        let f = ScalarField3D::zeros(4, 1, 4);
        let err = gradient(&f, [1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            VecPotError::InsufficientGridSize { axis: 1, len: 1 }
        ));
    }

    #[test]
    fn out_of_range_axis_is_an_error() {
        let f = ScalarField3D::zeros(3, 3, 3);
        assert!(matches!(
            partial_derivative(&f, 3, 1.0),
            Err(VecPotError::InvalidGridGeometry(_))
        ));
    }

    #[test]
    fn non_positive_spacing_is_rejected() {
        let f = ScalarField3D::zeros(3, 3, 3);
        assert!(matches!(
            gradient(&f, [1.0, 0.0, 1.0]),
            Err(VecPotError::InvalidGridGeometry(_))
        ));
    }
}

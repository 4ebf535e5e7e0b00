// src/poisson/spectral.rs
//
// FFT Poisson solver with free-space (open) boundaries: the "pspfft" backend.
//
// We compute the free-space solution of ∇²u = f,
//   u(r) = -(1/4π) ∫ f(r') / |r - r'| dV'
// as a discrete convolution over the grid:
//   u_i = Σ_j G(r_i - r_j) f_j,    G(d) = -dV / (4π |d|)   (d != 0)
//
// This implementation:
// - zero-pads to 2N per axis so the circular FFT convolution equals the linear one
//   (Hockney's method; no periodic images)
// - replaces the singular self term by the potential at the centre of a uniformly
//   filled cell: ∫_cell 1/|r| dV = 2.3800772 h^2 for a cube, 2π R^2 for the
//   equal-volume sphere otherwise
// - caches the transformed kernel for the last grid seen, so the three components
//   of one vector potential share one kernel build
//
// The initial guess is not used; the result does not depend on it.

use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use super::{PoissonSolution, PoissonSolver, SolveControl, SolveReport, check_inputs};
use crate::error::{Result, VecPotError};
use crate::geometry::AxisCoords;
use crate::grid::idx3;
use crate::scalar_field::ScalarField3D;

/// ∫ 1/|r| dV over a unit cube, evaluated at its centre.
const CUBE_SELF_POTENTIAL: f64 = 2.380_077_2;

/// Forward and inverse FFT plans for the three padded axis lengths.
#[derive(Clone)]
struct Plans {
    fwd: [Arc<dyn Fft<f64>>; 3],
    inv: [Arc<dyn Fft<f64>>; 3],
}

impl Plans {
    fn new(padded: [usize; 3]) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            fwd: [
                planner.plan_fft_forward(padded[0]),
                planner.plan_fft_forward(padded[1]),
                planner.plan_fft_forward(padded[2]),
            ],
            inv: [
                planner.plan_fft_inverse(padded[0]),
                planner.plan_fft_inverse(padded[1]),
                planner.plan_fft_inverse(padded[2]),
            ],
        }
    }
}

#[derive(Clone)]
struct KernelCache {
    dims: [usize; 3],
    spacing: [f64; 3],
    padded: [usize; 3],
    kernel_hat: Arc<Vec<Complex<f64>>>,
    plans: Plans,
}

impl KernelCache {
    fn matches(&self, dims: [usize; 3], spacing: [f64; 3]) -> bool {
        self.dims == dims && self.spacing == spacing
    }
}

/// Free-space FFT Poisson solver.
#[derive(Default)]
pub struct SpectralSolver {
    cache: Mutex<Option<KernelCache>>,
}

impl SpectralSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel for this grid, building (and caching) it if the grid changed.
    fn kernel_for(&self, dims: [usize; 3], spacing: [f64; 3]) -> KernelCache {
        // Only complete kernels are ever stored, so a poisoned lock is still usable.
        let mut guard = match self.cache.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(c) = guard.as_ref().filter(|c| c.matches(dims, spacing)) {
            return c.clone();
        }

        let t0 = Instant::now();
        let built = build_kernel(dims, spacing);
        debug!(
            ?dims,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "built free-space Green's function kernel"
        );
        *guard = Some(built.clone());
        built
    }
}

impl PoissonSolver for SpectralSolver {
    fn name(&self) -> &'static str {
        "pspfft"
    }

    fn solve(
        &self,
        coords: &AxisCoords,
        source: &ScalarField3D,
        guess: &ScalarField3D,
        control: &SolveControl,
    ) -> Result<PoissonSolution> {
        let h = check_inputs(coords, source, guess)?;
        if control.should_stop() {
            return Err(VecPotError::Cancelled { iterations: 0 });
        }

        let dims = source.shape();
        let [nx, ny, nz] = dims;
        let kc = self.kernel_for(dims, h);
        let [px, py, _] = kc.padded;

        // Embed the source in the low corner of the padded box.
        let n_pad = kc.padded.iter().product::<usize>();
        let mut buf = vec![Complex::new(0.0, 0.0); n_pad];
        for k in 0..nz {
            for j in 0..ny {
                let src_row = idx3(0, j, k, nx, ny);
                let dst_row = idx3(0, j, k, px, py);
                for i in 0..nx {
                    buf[dst_row + i] = Complex::new(source.data[src_row + i], 0.0);
                }
            }
        }

        fft3_in_place(&mut buf, kc.padded, &kc.plans.fwd);
        buf.par_iter_mut()
            .zip(kc.kernel_hat.par_iter())
            .for_each(|(b, g)| *b *= *g);
        fft3_in_place(&mut buf, kc.padded, &kc.plans.inv);

        // rustfft is unnormalised -> scale on extraction.
        let scale = 1.0 / n_pad as f64;
        let mut out = ScalarField3D::zeros(nx, ny, nz);
        out.data
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(row_idx, row)| {
                let k = row_idx / ny;
                let j = row_idx % ny;
                let src = idx3(0, j, k, px, py);
                for (i, v) in row.iter_mut().enumerate() {
                    *v = buf[src + i].re * scale;
                }
            });

        Ok(PoissonSolution {
            field: out,
            report: SolveReport::direct(self.name()),
        })
    }
}

/// Potential at the centre of a uniformly filled cell, ∫_cell 1/|r| dV.
fn self_cell_integral(spacing: [f64; 3]) -> f64 {
    let [dx, dy, dz] = spacing;
    let hmax = dx.max(dy).max(dz);
    let hmin = dx.min(dy).min(dz);
    if hmax - hmin <= 1e-12 * hmax {
        CUBE_SELF_POTENTIAL * dx * dx
    } else {
        let r = (3.0 * dx * dy * dz / (4.0 * PI)).cbrt();
        2.0 * PI * r * r
    }
}

/// Signed displacement for padded index `a` on an axis of padded length `p`.
#[inline]
fn wrap_displacement(a: usize, p: usize) -> isize {
    if 2 * a < p {
        a as isize
    } else {
        a as isize - p as isize
    }
}

fn build_kernel(dims: [usize; 3], spacing: [f64; 3]) -> KernelCache {
    let padded = [2 * dims[0], 2 * dims[1], 2 * dims[2]];
    let [px, py, pz] = padded;
    let [dx, dy, dz] = spacing;
    let dvol = dx * dy * dz;
    let inv4pi = 1.0 / (4.0 * PI);
    let g0 = -inv4pi * self_cell_integral(spacing);

    let mut kernel = vec![Complex::new(0.0, 0.0); px * py * pz];
    kernel
        .par_chunks_mut(px)
        .enumerate()
        .for_each(|(row_idx, row)| {
            let c = row_idx / py;
            let b = row_idx % py;
            let ry = wrap_displacement(b, py) as f64 * dy;
            let rz = wrap_displacement(c, pz) as f64 * dz;
            for (a, g) in row.iter_mut().enumerate() {
                let rx = wrap_displacement(a, px) as f64 * dx;
                let r2 = rx * rx + ry * ry + rz * rz;
                let val = if r2 > 0.0 {
                    -inv4pi * dvol / r2.sqrt()
                } else {
                    g0
                };
                *g = Complex::new(val, 0.0);
            }
        });

    let plans = Plans::new(padded);
    fft3_in_place(&mut kernel, padded, &plans.fwd);

    KernelCache {
        dims,
        spacing,
        padded,
        kernel_hat: Arc::new(kernel),
        plans,
    }
}

/// Unnormalised 3D FFT (in place), applying 1D transforms along x, then y, then z.
fn fft3_in_place(data: &mut [Complex<f64>], dims: [usize; 3], plans: &[Arc<dyn Fft<f64>>; 3]) {
    let [nx, ny, nz] = dims;
    let plane = nx * ny;
    let n = plane * nz;
    debug_assert_eq!(data.len(), n);

    // 1) x: rows are contiguous.
    data.par_chunks_mut(nx).for_each(|row| plans[0].process(row));

    // 2) y: gather columns plane by plane.
    data.par_chunks_mut(plane).for_each(|pl| {
        let mut col = vec![Complex::new(0.0, 0.0); ny];
        for i in 0..nx {
            for j in 0..ny {
                col[j] = pl[j * nx + i];
            }
            plans[1].process(&mut col);
            for j in 0..ny {
                pl[j * nx + i] = col[j];
            }
        }
    });

    // 3) z: transpose so z-lines are contiguous, transform, transpose back.
    let mut tmp = vec![Complex::new(0.0, 0.0); n];
    {
        let data_ro: &[Complex<f64>] = &*data;
        tmp.par_chunks_mut(nz).enumerate().for_each(|(l, line)| {
            for (k, v) in line.iter_mut().enumerate() {
                *v = data_ro[k * plane + l];
            }
        });
    }
    tmp.par_chunks_mut(nz).for_each(|line| plans[2].process(line));

    let tmp_ro: &[Complex<f64>] = &tmp;
    data.par_chunks_mut(plane).enumerate().for_each(|(k, pl)| {
        for (l, v) in pl.iter_mut().enumerate() {
            *v = tmp_ro[l * nz + k];
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid3D;

    #[test]
    fn fft3_round_trip_recovers_input() {
        let dims = [4, 6, 5];
        let n: usize = dims.iter().product();
        let plans = Plans::new(dims);
        let orig: Vec<Complex<f64>> = (0..n)
            .map(|t| Complex::new((t as f64 * 0.37).sin(), 0.0))
            .collect();
        let mut buf = orig.clone();
        fft3_in_place(&mut buf, dims, &plans.fwd);
        fft3_in_place(&mut buf, dims, &plans.inv);
        for (a, b) in buf.iter().zip(orig.iter()) {
            assert!((a.re / n as f64 - b.re).abs() < 1e-12);
            assert!((a.im / n as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn kernel_is_reused_for_identical_grids() {
        let solver = SpectralSolver::new();
        let a = solver.kernel_for([4, 4, 4], [0.5; 3]);
        let b = solver.kernel_for([4, 4, 4], [0.5; 3]);
        assert!(Arc::ptr_eq(&a.kernel_hat, &b.kernel_hat));
        let c = solver.kernel_for([4, 4, 5], [0.5; 3]);
        assert!(!Arc::ptr_eq(&a.kernel_hat, &c.kernel_hat));
    }

    #[test]
    fn single_cell_source_gives_direct_sum() {
        // u_i = Σ_j G(r_i - r_j) f_j with one non-zero sample: u is the kernel itself.
        let h = 0.5;
        let grid = Grid3D::cubic(5, 5, 5, h);
        let coords = AxisCoords::uniform([0.0; 3], &grid);
        let mut src = ScalarField3D::zeros(5, 5, 5);
        src.set(1, 2, 3, 2.0);
        let guess = ScalarField3D::zeros_like(&src);

        let sol = SpectralSolver::new()
            .solve(&coords, &src, &guess, &SolveControl::new())
            .unwrap();
        assert!(sol.report.converged);

        let dvol = grid.dvol();
        for &(i, j, k) in &[(4usize, 0usize, 0usize), (1, 2, 4), (3, 3, 3)] {
            let d = [
                (i as f64 - 1.0) * h,
                (j as f64 - 2.0) * h,
                (k as f64 - 3.0) * h,
            ];
            let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
            let expected = -2.0 * dvol / (4.0 * PI * r);
            let got = sol.field.get(i, j, k);
            assert!(
                (got - expected).abs() < 1e-12,
                "({},{},{}): got {}, expected {}",
                i,
                j,
                k,
                got,
                expected
            );
        }

        let self_expected = -2.0 * CUBE_SELF_POTENTIAL * h * h / (4.0 * PI);
        assert!((sol.field.get(1, 2, 3) - self_expected).abs() < 1e-12);
    }
}

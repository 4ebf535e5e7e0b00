// src/poisson/jacobi.rs
//
// Iterative Poisson solver: Jacobi relaxation of the 7-point Laplacian.
//
//   u_new[c] = ( sx (u[x-] + u[x+]) + sy (u[y-] + u[y+]) + sz (u[z-] + u[z+]) - f[c] )
//              / ( 2 (sx + sy + sz) ),        s_axis = 1/h_axis^2
//
// Boundary points are Dirichlet values fixed before the first sweep (see `boundary`).
// Stops when max |u_new - u_old| < conv_eps or after maxiter sweeps. Running out of
// iterations is not an error: the last iterate is returned with `converged = false`.
//
// Each sweep reads only the previous iterate, so the row-parallel update gives the
// same result as a serial sweep.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, warn};

use super::boundary;
use super::{PoissonSolution, PoissonSolver, SolveControl, SolveReport, check_inputs};
use crate::error::{Result, VecPotError};
use crate::geometry::AxisCoords;
use crate::params::{BoundaryPolicy, SolverConfig};
use crate::scalar_field::ScalarField3D;

/// How often (in sweeps) a debug progress line is emitted.
const PROGRESS_STRIDE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobiSolver {
    pub conv_eps: f64,
    pub maxiter: usize,
    pub boundary: BoundaryPolicy,
    /// Sample the update norm every `history_stride` sweeps (0 disables).
    pub history_stride: usize,
}

impl JacobiSolver {
    pub fn new(conv_eps: f64, maxiter: usize) -> Self {
        Self {
            conv_eps,
            maxiter,
            boundary: BoundaryPolicy::InitialGuess,
            history_stride: 0,
        }
    }

    pub fn from_config(cfg: &SolverConfig) -> Self {
        Self {
            conv_eps: cfg.conv_eps,
            maxiter: cfg.maxiter,
            boundary: cfg.boundary,
            history_stride: cfg.history_stride,
        }
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_history_stride(mut self, stride: usize) -> Self {
        self.history_stride = stride;
        self
    }
}

impl PoissonSolver for JacobiSolver {
    fn name(&self) -> &'static str {
        "iterative"
    }

    fn solve(
        &self,
        coords: &AxisCoords,
        source: &ScalarField3D,
        guess: &ScalarField3D,
        control: &SolveControl,
    ) -> Result<PoissonSolution> {
        let h = check_inputs(coords, source, guess)?;
        let [nx, ny, nz] = source.shape();

        let mut phi = guess.data.clone();
        boundary::apply(self.boundary, &mut phi, coords, source, h);

        let mut report = SolveReport {
            backend: self.name().to_string(),
            converged: true,
            iterations: 0,
            final_update: 0.0,
            conv_eps: self.conv_eps,
            history: Vec::new(),
        };

        if nx < 3 || ny < 3 || nz < 3 {
            // No interior points: the boundary values are the whole answer.
            return Ok(PoissonSolution {
                field: ScalarField3D::from_vec(nx, ny, nz, phi)?,
                report,
            });
        }

        let sx = 1.0 / (h[0] * h[0]);
        let sy = 1.0 / (h[1] * h[1]);
        let sz = 1.0 / (h[2] * h[2]);
        let inv_denom = 1.0 / (2.0 * (sx + sy + sz));
        let plane = nx * ny;

        // Boundary values in `tmp` never change, so they stay valid across swaps.
        let mut tmp = phi.clone();
        let rhs: &[f64] = &source.data;

        let t0 = Instant::now();
        report.converged = false;

        for iter in 1..=self.maxiter {
            if control.should_stop() {
                return Err(VecPotError::Cancelled {
                    iterations: iter - 1,
                });
            }

            let phi_ro: &[f64] = &phi;
            let update = tmp
                .par_chunks_mut(nx)
                .enumerate()
                .map(|(row_idx, tmp_row)| {
                    let k = row_idx / ny;
                    let j = row_idx % ny;
                    if k == 0 || k + 1 == nz || j == 0 || j + 1 == ny {
                        return 0.0f64;
                    }
                    let base = row_idx * nx;
                    let mut row_max = 0.0f64;
                    for i in 1..(nx - 1) {
                        let id = base + i;

                        let xm = phi_ro[id - 1];
                        let xp = phi_ro[id + 1];
                        let ym = phi_ro[id - nx];
                        let yp = phi_ro[id + nx];
                        let zm = phi_ro[id - plane];
                        let zp = phi_ro[id + plane];

                        let off = sx * (xm + xp) + sy * (ym + yp) + sz * (zm + zp);
                        let phi_new = (off - rhs[id]) * inv_denom;

                        row_max = nan_max(row_max, (phi_new - phi_ro[id]).abs());
                        tmp_row[i] = phi_new;
                    }
                    row_max
                })
                .reduce(|| 0.0f64, nan_max);

            std::mem::swap(&mut phi, &mut tmp);

            report.iterations = iter;
            report.final_update = update;
            if self.history_stride > 0 && (iter == 1 || iter % self.history_stride == 0) {
                report.history.push((iter, update));
            }
            if iter % PROGRESS_STRIDE == 0 {
                debug!(iter, update, "jacobi sweep");
            }

            if !update.is_finite() {
                warn!(iter, "jacobi update is not finite; stopping");
                break;
            }
            if update < self.conv_eps {
                report.converged = true;
                break;
            }
        }

        if self.history_stride > 0 {
            let last = (report.iterations, report.final_update);
            if report.history.last() != Some(&last) {
                report.history.push(last);
            }
        }

        if report.converged {
            debug!(
                iterations = report.iterations,
                update = report.final_update,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "jacobi converged"
            );
        } else {
            warn!(
                iterations = report.iterations,
                update = report.final_update,
                conv_eps = self.conv_eps,
                "jacobi hit maxiter without converging; returning best estimate"
            );
        }

        Ok(PoissonSolution {
            field: ScalarField3D::from_vec(nx, ny, nz, phi)?,
            report,
        })
    }
}

/// `f64::max` ignores NaN; the update norm must not.
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

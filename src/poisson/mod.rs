// src/poisson/mod.rs
//
// Poisson solvers for ∇²u = f on a uniform rectangular grid with (approximately)
// open boundaries, u -> 0 far from the source.
//
// Backends:
//   - `jacobi::JacobiSolver`     : Jacobi relaxation on the 7-point stencil ("iterative")
//   - `spectral::SpectralSolver` : zero-padded FFT convolution with the free-space
//                                  Green's function ("pspfft"), behind the `spectral` feature
//
// Call sites pick a backend through `resolve_backend`, which fails before any numerical
// work if the requested backend is not compiled in.

pub mod analytic;
pub mod boundary;
pub mod jacobi;
#[cfg(feature = "spectral")]
pub mod spectral;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Result, VecPotError};
use crate::geometry::AxisCoords;
use crate::params::{PoissonMethod, SolverConfig};
use crate::scalar_field::ScalarField3D;

pub use jacobi::JacobiSolver;
#[cfg(feature = "spectral")]
pub use spectral::SpectralSolver;

/// Diagnostics of one Poisson solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveReport {
    pub backend: String,
    pub converged: bool,
    pub iterations: usize,
    /// Max-norm of the last update (0 for direct solvers).
    pub final_update: f64,
    /// Convergence threshold the solve was run with (0 for direct solvers).
    pub conv_eps: f64,
    /// Sampled (iteration, update norm) pairs.
    pub history: Vec<(usize, f64)>,
}

impl SolveReport {
    /// Report for a direct (non-iterative) solve.
    pub fn direct(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            converged: true,
            iterations: 0,
            final_update: 0.0,
            conv_eps: 0.0,
            history: Vec::new(),
        }
    }

    /// Turn a soft non-convergence into `Err(NonConvergence)`.
    pub fn require_converged(&self) -> Result<()> {
        if self.converged {
            Ok(())
        } else {
            Err(VecPotError::NonConvergence {
                iterations: self.iterations,
                last_update: self.final_update,
                conv_eps: self.conv_eps,
            })
        }
    }
}

/// Solved field plus its diagnostics.
#[derive(Debug, Clone)]
pub struct PoissonSolution {
    pub field: ScalarField3D,
    pub report: SolveReport,
}

/// Cancellation / deadline check consulted by solvers once per iteration.
#[derive(Debug, Clone, Default)]
pub struct SolveControl {
    cancel: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl SolveControl {
    /// Never stops early.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop as soon as `flag` is set (from any thread).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Stop once `timeout` has elapsed from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        match self.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }
}

/// Common contract of all Poisson backends.
pub trait PoissonSolver: Send + Sync {
    /// Backend name as accepted on the command line.
    fn name(&self) -> &'static str;

    /// Solve ∇²u = `source` on the grid given by `coords`, starting from `guess`.
    fn solve(
        &self,
        coords: &AxisCoords,
        source: &ScalarField3D,
        guess: &ScalarField3D,
        control: &SolveControl,
    ) -> Result<PoissonSolution>;
}

/// Shared input validation: congruent shapes and uniform ascending coordinates.
/// Returns the per-axis spacing.
pub fn check_inputs(
    coords: &AxisCoords,
    source: &ScalarField3D,
    guess: &ScalarField3D,
) -> Result<[f64; 3]> {
    if coords.shape() != source.shape() {
        return Err(VecPotError::ShapeMismatch {
            expected: source.shape(),
            found: coords.shape(),
        });
    }
    source.ensure_same_shape(guess)?;
    coords.spacing()
}

/// True if the FFT backend was compiled in.
pub fn spectral_available() -> bool {
    cfg!(feature = "spectral")
}

/// Build the backend selected by `cfg`.
///
/// This is the only place a backend can turn out to be missing; callers resolve it
/// before reading or processing any field.
pub fn resolve_backend(cfg: &SolverConfig) -> Result<Box<dyn PoissonSolver>> {
    cfg.validate()?;
    match cfg.method {
        PoissonMethod::Iterative => Ok(Box::new(JacobiSolver::from_config(cfg))),
        PoissonMethod::Spectral => spectral_backend(),
    }
}

#[cfg(feature = "spectral")]
fn spectral_backend() -> Result<Box<dyn PoissonSolver>> {
    Ok(Box::new(SpectralSolver::new()))
}

#[cfg(not(feature = "spectral"))]
fn spectral_backend() -> Result<Box<dyn PoissonSolver>> {
    Err(VecPotError::SolverUnavailable {
        name: PoissonMethod::Spectral.as_str().to_string(),
        reason: "this build does not include the FFT backend (enable the `spectral` feature) \
                 - use the 'iterative' solver instead"
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterative_backend_always_resolves() {
        let s = resolve_backend(&SolverConfig::iterative()).unwrap();
        assert_eq!(s.name(), "iterative");
    }

    #[cfg(feature = "spectral")]
    #[test]
    fn spectral_backend_resolves_when_compiled_in() {
        assert!(spectral_available());
        let s = resolve_backend(&SolverConfig::default()).unwrap();
        assert_eq!(s.name(), "pspfft");
    }

    #[cfg(not(feature = "spectral"))]
    #[test]
    fn spectral_backend_is_unavailable_without_feature() {
        assert!(!spectral_available());
        let err = resolve_backend(&SolverConfig::default()).err().unwrap();
        assert!(matches!(err, VecPotError::SolverUnavailable { .. }));
    }

    #[test]
    fn invalid_config_fails_at_resolution() {
        let mut cfg = SolverConfig::iterative();
        cfg.conv_eps = -1.0;
        assert!(matches!(
            resolve_backend(&cfg),
            Err(VecPotError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cancel_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctl = SolveControl::new().with_cancel_flag(flag.clone());
        assert!(!ctl.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(ctl.should_stop());
    }

    #[test]
    fn elapsed_timeout_stops() {
        let ctl = SolveControl::new().with_timeout(Duration::ZERO);
        assert!(ctl.should_stop());
        assert!(!SolveControl::new().should_stop());
    }

    #[test]
    fn non_converged_report_becomes_error_on_request() {
        let mut r = SolveReport::direct("iterative");
        assert!(r.require_converged().is_ok());
        r.converged = false;
        r.iterations = 10;
        assert!(matches!(
            r.require_converged(),
            Err(VecPotError::NonConvergence { iterations: 10, .. })
        ));
    }
}

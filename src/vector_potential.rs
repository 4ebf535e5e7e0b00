// src/vector_potential.rs
//
// Vector potential A(r) of a magnetic dipole density M(r).
//
// Physics (Gaussian/atomic units):
//   J(r) = ∇ × M(r)                          (magnetisation current density)
//   ∇² A_i(r) = -(4π / c) J_i(r),   i = x, y, z
//
// Pipeline:
//   1. shape, geometry and finiteness validation (fail fast, nothing computed before it passes)
//   2. total magnetic dipole  Σ M dV  (diagnostic, returned)
//   3. J = curl M by finite differences
//   4. three independent Poisson solves with zero initial guess
//
// Grids whose axes are not the Cartesian basis are handled in the grid frame:
// M is rotated into it, the curl picks up the handedness of the axis triple, and A
// is rotated back, so A always comes out in Cartesian components.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::{Result, VecPotError};
use crate::geometry::{Atom, GridGeometry};
use crate::operators::curl;
use crate::params::{SolverConfig, Units};
use crate::poisson::{PoissonSolution, PoissonSolver, SolveControl, SolveReport, resolve_backend};
use crate::scalar_field::ScalarField3D;
use crate::vector_field::VectorField3D;

/// Output of the pipeline: A plus diagnostics and the pass-through header data.
#[derive(Debug, Clone)]
pub struct VectorPotential {
    pub atoms: Vec<Atom>,
    pub geometry: GridGeometry,
    /// Cartesian components (Ax, Ay, Az).
    pub a: VectorField3D,
    /// Σ M dV, Cartesian components (au).
    pub magnetic_dipole: [f64; 3],
    /// One report per component, x, y, z.
    pub reports: [SolveReport; 3],
}

impl VectorPotential {
    pub fn all_converged(&self) -> bool {
        self.reports.iter().all(|r| r.converged)
    }
}

/// Curl + Poisson pipeline bound to one resolved backend.
pub struct VectorPotentialSolver {
    backend: Box<dyn PoissonSolver>,
    units: Units,
    parallel_components: bool,
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl VectorPotentialSolver {
    /// Resolve the configured backend. An unavailable backend fails here, before any
    /// field is read or processed.
    pub fn from_config(cfg: &SolverConfig, units: Units) -> Result<Self> {
        let backend = resolve_backend(cfg)?;
        let mut s = Self::with_backend(backend, units)?;
        s.parallel_components = cfg.parallel_components;
        s.timeout = cfg.timeout;
        Ok(s)
    }

    /// Use an explicit backend.
    pub fn with_backend(backend: Box<dyn PoissonSolver>, units: Units) -> Result<Self> {
        if !(units.speed_of_light > 0.0) || !units.speed_of_light.is_finite() {
            return Err(VecPotError::InvalidConfig(format!(
                "speed of light must be positive, got {}",
                units.speed_of_light
            )));
        }
        Ok(Self {
            backend,
            units,
            parallel_components: true,
            timeout: None,
            cancel: None,
        })
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_parallel_components(mut self, on: bool) -> Self {
        self.parallel_components = on;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Control for one component solve; the timeout clock starts here.
    fn component_control(&self) -> SolveControl {
        let mut control = SolveControl::new();
        if let Some(t) = self.timeout {
            control = control.with_timeout(t);
        }
        if let Some(flag) = &self.cancel {
            control = control.with_cancel_flag(flag.clone());
        }
        control
    }

    /// Run the pipeline on (mx, my, mz) sampled on `geometry`.
    pub fn solve(
        &self,
        atoms: &[Atom],
        geometry: &GridGeometry,
        mx: &ScalarField3D,
        my: &ScalarField3D,
        mz: &ScalarField3D,
    ) -> Result<VectorPotential> {
        // 1. validation
        mx.ensure_same_shape(my)?;
        mx.ensure_same_shape(mz)?;
        let vg = geometry.validate(mx.shape())?;
        let spacing = vg.grid.spacing();
        for (axis, &len) in vg.grid.dims().iter().enumerate() {
            if len < 2 {
                return Err(VecPotError::InsufficientGridSize { axis, len });
            }
        }

        for (component, f) in [("Mx", mx), ("My", my), ("Mz", mz)] {
            if let Some(index) = f.first_non_finite() {
                return Err(VecPotError::NonFiniteSample { component, index });
            }
        }

        let m = VectorField3D::new(mx.clone(), my.clone(), mz.clone())?;

        // 2. total magnetic dipole
        let magnetic_dipole = total_magnetic_dipole(&m, vg.grid.dvol());
        info!(
            mx = magnetic_dipole[0],
            my = magnetic_dipole[1],
            mz = magnetic_dipole[2],
            "integrated magnetic dipole (au)"
        );

        // 3. current density in the grid frame
        info!("computing current density J = rot M");
        let cartesian = vg.is_cartesian();
        let m_grid = if cartesian { m } else { m.rotated(&vg.frame) };
        let j = curl::curl_field(&m_grid, spacing)?;
        drop(m_grid);

        // 4. Poisson solves, -(4π/c) J_i as source; handedness flips the curl sign
        //    for left-handed axis triples.
        info!(
            backend = self.backend.name(),
            parallel = self.parallel_components,
            "solving Poisson equation for each component"
        );
        let prefactor = -4.0 * PI / self.units.speed_of_light * vg.handedness;
        let [mut src_x, mut src_y, mut src_z] = j.into_components();
        src_x.scale_mut(prefactor);
        src_y.scale_mut(prefactor);
        src_z.scale_mut(prefactor);

        let t0 = Instant::now();
        let solve_one = |source: &ScalarField3D| -> Result<PoissonSolution> {
            let guess = ScalarField3D::zeros_like(source);
            self.backend
                .solve(&vg.coords, source, &guess, &self.component_control())
        };
        let (sol_x, (sol_y, sol_z)) = if self.parallel_components {
            rayon::join(
                || solve_one(&src_x),
                || rayon::join(|| solve_one(&src_y), || solve_one(&src_z)),
            )
        } else {
            (solve_one(&src_x), (solve_one(&src_y), solve_one(&src_z)))
        };
        let (sol_x, sol_y, sol_z) = (sol_x?, sol_y?, sol_z?);
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Poisson solves finished"
        );

        let a_grid = VectorField3D::new(sol_x.field, sol_y.field, sol_z.field)?;
        let a = if cartesian {
            a_grid
        } else {
            a_grid.rotated(&vg.frame_transposed())
        };

        Ok(VectorPotential {
            atoms: atoms.to_vec(),
            geometry: *geometry,
            a,
            magnetic_dipole,
            reports: [sol_x.report, sol_y.report, sol_z.report],
        })
    }
}

/// Σ M dV per component.
pub fn total_magnetic_dipole(m: &VectorField3D, dvol: f64) -> [f64; 3] {
    m.integrate(dvol)
}

/// One-shot convenience: resolve the backend from `cfg`, then run the pipeline.
pub fn vector_potential_poisson(
    atoms: &[Atom],
    geometry: &GridGeometry,
    mx: &ScalarField3D,
    my: &ScalarField3D,
    mz: &ScalarField3D,
    cfg: &SolverConfig,
    units: Units,
) -> Result<VectorPotential> {
    VectorPotentialSolver::from_config(cfg, units)?.solve(atoms, geometry, mx, my, mz)
}

// src/job.rs
//
// File-to-file driver: three M cube files in, three A cube files out.
//
// Order of work:
//   1. resolve the Poisson backend and check the paths (both fail before any I/O)
//   2. read Mx, My, Mz; geometry and atoms come from the Mx header
//   3. run the pipeline
//   4. write Ax, Ay, Az (only after all three solves have returned, and in strict
//      mode only if all three converged)

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::cube::{read_cube, write_cube};
use crate::error::{Result, VecPotError};
use crate::params::{SolverConfig, Units};
use crate::vector_potential::{VectorPotential, VectorPotentialSolver};

#[derive(Debug, Clone, PartialEq)]
pub struct CubeJob {
    /// Mx, My, Mz.
    pub inputs: [PathBuf; 3],
    /// Ax, Ay, Az.
    pub outputs: [PathBuf; 3],
    /// Treat a non-converged component solve as an error (nothing is written).
    pub strict: bool,
}

/// Result of a finished job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub potential: VectorPotential,
    pub elapsed_secs: f64,
}

const OUTPUT_COMMENTS: [&str; 3] = [
    "vector potential Ax (au)",
    "vector potential Ay (au)",
    "vector potential Az (au)",
];

impl CubeJob {
    pub fn new(inputs: [PathBuf; 3], outputs: [PathBuf; 3]) -> Self {
        Self {
            inputs,
            outputs,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn run(&self, cfg: &SolverConfig, units: Units) -> Result<JobOutcome> {
        let solver = VectorPotentialSolver::from_config(cfg, units)?;
        self.run_with(&solver)
    }

    pub fn run_with(&self, solver: &VectorPotentialSolver) -> Result<JobOutcome> {
        check_paths(self)?;
        let t0 = Instant::now();

        let [px, py, pz] = &self.inputs;
        info!(path = %px.display(), "reading Mx");
        let cx = read_cube(px)?;
        info!(path = %py.display(), "reading My");
        let cy = read_cube(py)?;
        info!(path = %pz.display(), "reading Mz");
        let cz = read_cube(pz)?;

        for (other, path) in [(&cy, py), (&cz, pz)] {
            if other.geometry != cx.geometry {
                warn!(
                    path = %path.display(),
                    "cube geometry differs from the Mx header; using the Mx geometry"
                );
            }
        }

        let potential = solver.solve(&cx.atoms, &cx.geometry, &cx.field, &cy.field, &cz.field)?;
        if self.strict {
            for r in &potential.reports {
                r.require_converged()?;
            }
        }

        let [ax, ay, az] = potential.a.clone().into_components();
        for ((field, path), comment) in [ax, ay, az]
            .into_iter()
            .zip(self.outputs.iter())
            .zip(OUTPUT_COMMENTS)
        {
            let out = cx.with_field(field, comment);
            info!(path = %path.display(), "writing cube");
            write_cube(path, &out)?;
        }

        Ok(JobOutcome {
            potential,
            elapsed_secs: t0.elapsed().as_secs_f64(),
        })
    }
}

/// Paths must be distinct between inputs and outputs.
pub fn check_paths(job: &CubeJob) -> Result<()> {
    for out in &job.outputs {
        if job.inputs.contains(out) {
            return Err(VecPotError::InvalidConfig(format!(
                "output {} would overwrite an input file",
                out.display()
            )));
        }
    }
    Ok(())
}

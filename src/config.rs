// src/config.rs
//
// JSON run report: what was run, with which settings, and how each solve went.

use serde::Serialize;
use std::fs::{File, create_dir_all};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::geometry::GridGeometry;
use crate::params::{SolverConfig, Units};
use crate::poisson::SolveReport;
use crate::vector_potential::VectorPotential;

#[derive(Serialize)]
pub struct RunReport {
    pub io: IoConfig,
    pub grid: GridInfo,
    pub solver: SolverInfo,
    pub units: UnitsInfo,
    pub results: ResultsInfo,
    pub run: RunInfo,
}

#[derive(Serialize)]
pub struct IoConfig {
    /// Mx, My, Mz cube files.
    pub inputs: [PathBuf; 3],
    /// Ax, Ay, Az cube files.
    pub outputs: [PathBuf; 3],
}

#[derive(Serialize)]
pub struct GridInfo {
    pub dims: [usize; 3],
    pub geometry: GridGeometry,
    pub n_atoms: usize,
}

#[derive(Serialize)]
pub struct SolverInfo {
    pub method: String,
    pub conv_eps: f64,
    pub maxiter: usize,
    pub boundary: String,
    pub history_stride: usize,
    pub timeout_secs: Option<f64>,
    pub parallel_components: bool,
}

#[derive(Serialize)]
pub struct UnitsInfo {
    pub speed_of_light: f64,
}

#[derive(Serialize)]
pub struct ResultsInfo {
    pub magnetic_dipole: [f64; 3],
    pub all_converged: bool,
    /// x, y, z component solves.
    pub reports: Vec<SolveReport>,
}

#[derive(Serialize)]
pub struct RunInfo {
    pub binary: String,
    pub version: String,
    pub elapsed_secs: f64,
}

impl SolverInfo {
    pub fn from_config(cfg: &SolverConfig) -> Self {
        Self {
            method: cfg.method.as_str().to_string(),
            conv_eps: cfg.conv_eps,
            maxiter: cfg.maxiter,
            boundary: cfg.boundary.as_str().to_string(),
            history_stride: cfg.history_stride,
            timeout_secs: cfg.timeout.map(|t| t.as_secs_f64()),
            parallel_components: cfg.parallel_components,
        }
    }
}

impl RunReport {
    pub fn new(
        io: IoConfig,
        cfg: &SolverConfig,
        units: Units,
        result: &VectorPotential,
        binary: &str,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            io,
            grid: GridInfo {
                dims: result.a.shape(),
                geometry: result.geometry,
                n_atoms: result.atoms.len(),
            },
            solver: SolverInfo::from_config(cfg),
            units: UnitsInfo {
                speed_of_light: units.speed_of_light,
            },
            results: ResultsInfo {
                magnetic_dipole: result.magnetic_dipole,
                all_converged: result.all_converged(),
                reports: result.reports.to_vec(),
            },
            run: RunInfo {
                binary: binary.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                elapsed_secs,
            },
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, self).map_err(std::io::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_info_uses_cli_names() {
        let cfg = SolverConfig::iterative();
        let info = SolverInfo::from_config(&cfg);
        assert_eq!(info.method, "iterative");
        assert_eq!(info.boundary, "guess");
        assert_eq!(info.timeout_secs, None);
    }
}

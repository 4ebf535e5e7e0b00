// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the curl / Poisson pipeline and its file boundary.
#[derive(Debug, Error)]
pub enum VecPotError {
    #[error("grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        found: [usize; 3],
    },

    #[error("non-finite {component} sample at grid point {index:?}")]
    NonFiniteSample {
        component: &'static str,
        index: [usize; 3],
    },

    #[error("invalid grid geometry: {0}")]
    InvalidGridGeometry(String),

    #[error("need at least 2 samples along axis {axis} to differentiate, got {len}")]
    InsufficientGridSize { axis: usize, len: usize },

    #[error("Poisson solver '{name}' is not available: {reason}")]
    SolverUnavailable { name: String, reason: String },

    #[error("unknown Poisson solver '{0}' (expected 'pspfft' or 'iterative')")]
    UnknownSolver(String),

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "iterative Poisson solver did not converge: {iterations} iterations, last update {last_update:.3e} > {conv_eps:.3e}"
    )]
    NonConvergence {
        iterations: usize,
        last_update: f64,
        conv_eps: f64,
    },

    #[error("Poisson solve cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    #[error("cube file {path}: {msg}")]
    CubeFormat { path: PathBuf, msg: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VecPotError>;

// src/params.rs

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Result, VecPotError};

/// Speed of light in atomic units (1/α, CODATA 2018).
pub const SPEED_OF_LIGHT_AU: f64 = 137.035_999_084;

/// Physical constants consumed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Units {
    /// Speed of light in the unit system of the grid data.
    pub speed_of_light: f64,
}

impl Units {
    pub fn atomic() -> Self {
        Self {
            speed_of_light: SPEED_OF_LIGHT_AU,
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Self::atomic()
    }
}

/// Poisson backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoissonMethod {
    /// FFT free-space convolution (the "pspfft" solver).
    Spectral,
    /// Jacobi relaxation on the 7-point stencil.
    Iterative,
}

impl PoissonMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spectral => "pspfft",
            Self::Iterative => "iterative",
        }
    }
}

impl FromStr for PoissonMethod {
    type Err = VecPotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pspfft" | "spectral" | "fft" => Ok(Self::Spectral),
            "iterative" | "jacobi" => Ok(Self::Iterative),
            _ => Err(VecPotError::UnknownSolver(s.to_string())),
        }
    }
}

/// What the iterative solver holds its outer boundary points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Keep the initial-guess values (zero when called from the vector-potential pipeline).
    InitialGuess,
    /// Force u = 0 on the boundary.
    Zero,
    /// Monopole + dipole far-field of the source, i.e. the leading multipoles of
    /// the free-space solution u(r) = -(1/4π) ∫ f(r') / |r - r'| dV'.
    Multipole,
}

impl BoundaryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialGuess => "guess",
            Self::Zero => "zero",
            Self::Multipole => "multipole",
        }
    }
}

impl FromStr for BoundaryPolicy {
    type Err = VecPotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guess" | "initial" | "initial_guess" => Ok(Self::InitialGuess),
            "zero" | "0" | "dirichlet0" => Ok(Self::Zero),
            "multipole" | "dipole" => Ok(Self::Multipole),
            _ => Err(VecPotError::InvalidConfig(format!(
                "unknown boundary policy '{}' (expected guess, zero or multipole)",
                s
            ))),
        }
    }
}

/// Immutable solver settings for one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolverConfig {
    pub method: PoissonMethod,
    /// Stop when max |u_new - u_old| < conv_eps (iterative backend).
    pub conv_eps: f64,
    /// Hard cap on Jacobi iterations.
    pub maxiter: usize,
    pub boundary: BoundaryPolicy,
    /// Record the update norm every `history_stride` iterations (0 disables).
    pub history_stride: usize,
    /// Wall-clock budget of each component solve; the clock restarts per component.
    pub timeout: Option<Duration>,
    /// Solve the three components concurrently on the rayon pool.
    pub parallel_components: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: PoissonMethod::Spectral,
            conv_eps: 1.0e-10,
            maxiter: 1_000_000,
            boundary: BoundaryPolicy::InitialGuess,
            history_stride: 100,
            timeout: None,
            parallel_components: true,
        }
    }
}

impl SolverConfig {
    pub fn iterative() -> Self {
        Self {
            method: PoissonMethod::Iterative,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.conv_eps > 0.0) || !self.conv_eps.is_finite() {
            return Err(VecPotError::InvalidConfig(format!(
                "conv_eps must be a positive number, got {}",
                self.conv_eps
            )));
        }
        if self.maxiter == 0 {
            return Err(VecPotError::InvalidConfig(
                "maxiter must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_parse() {
        assert_eq!(
            "pspfft".parse::<PoissonMethod>().unwrap(),
            PoissonMethod::Spectral
        );
        assert_eq!(
            " Iterative ".parse::<PoissonMethod>().unwrap(),
            PoissonMethod::Iterative
        );
        assert!(matches!(
            "multigrid".parse::<PoissonMethod>(),
            Err(VecPotError::UnknownSolver(_))
        ));
    }

    #[test]
    fn defaults_match_command_line_defaults() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.method, PoissonMethod::Spectral);
        assert_eq!(cfg.conv_eps, 1.0e-10);
        assert_eq!(cfg.maxiter, 1_000_000);
        assert_eq!(cfg.boundary, BoundaryPolicy::InitialGuess);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut cfg = SolverConfig::iterative();
        cfg.conv_eps = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SolverConfig::iterative();
        cfg.maxiter = 0;
        assert!(cfg.validate().is_err());
    }
}

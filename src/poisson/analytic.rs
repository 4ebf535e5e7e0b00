// src/poisson/analytic.rs
//
// Closed-form reference problem for the Poisson backends: a normalised Gaussian
// charge
//
//   ρ(r) = exp(-|r - c|² / 2σ²) / ((2π)^{3/2} σ³),       ∫ ρ dV = 1
//
// with source f = -4πρ, so that ∇²u = f has the free-space solution
//
//   u(r) = erf(|r - c| / (√2 σ)) / |r - c|,                u(c) = √(2/π) / σ

use std::f64::consts::PI;

use statrs::function::erf::erf;

use crate::geometry::AxisCoords;
use crate::scalar_field::ScalarField3D;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianCharge {
    pub center: [f64; 3],
    pub sigma: f64,
}

impl GaussianCharge {
    pub fn new(center: [f64; 3], sigma: f64) -> Self {
        Self { center, sigma }
    }

    fn distance(&self, r: [f64; 3]) -> f64 {
        let d = [
            r[0] - self.center[0],
            r[1] - self.center[1],
            r[2] - self.center[2],
        ];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    pub fn density(&self, r: [f64; 3]) -> f64 {
        let s = self.sigma;
        let d = self.distance(r);
        (-d * d / (2.0 * s * s)).exp() / ((2.0 * PI).powf(1.5) * s * s * s)
    }

    pub fn potential(&self, r: [f64; 3]) -> f64 {
        let d = self.distance(r);
        if d < 1e-12 * self.sigma {
            return (2.0 / PI).sqrt() / self.sigma;
        }
        erf(d / (2.0f64.sqrt() * self.sigma)) / d
    }

    /// f = -4πρ sampled on the grid.
    pub fn source(&self, coords: &AxisCoords) -> ScalarField3D {
        let [nx, ny, nz] = coords.shape();
        ScalarField3D::from_fn(nx, ny, nz, |i, j, k| {
            -4.0 * PI * self.density([coords.x[i], coords.y[j], coords.z[k]])
        })
    }

    /// u sampled on the grid.
    pub fn exact(&self, coords: &AxisCoords) -> ScalarField3D {
        let [nx, ny, nz] = coords.shape();
        ScalarField3D::from_fn(nx, ny, nz, |i, j, k| {
            self.potential([coords.x[i], coords.y[j], coords.z[k]])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn potential_matches_erf_profile() {
        // u(√2σ) = erf(1) / (√2σ)
        let sigma = 0.5;
        let g = GaussianCharge::new([1.0, -2.0, 0.5], sigma);
        let d = 2.0f64.sqrt() * sigma;
        let u = g.potential([1.0 + d, -2.0, 0.5]);
        assert!((u - 0.842_700_792_949_715 / d).abs() < 1e-12);
    }

    #[test]
    fn potential_is_continuous_at_the_centre() {
        let g = GaussianCharge::new([0.0; 3], 0.7);
        let at_centre = g.potential([0.0; 3]);
        let near = g.potential([1e-4, 0.0, 0.0]);
        assert!((at_centre - near).abs() < 1e-6);
        // Far away it is a unit point charge.
        let far = g.potential([20.0, 0.0, 0.0]);
        assert!((far - 1.0 / 20.0).abs() < 1e-9);
    }
}

// src/poisson/boundary.rs
//
// Dirichlet values for the outer faces of the relaxation box.
//
// The physical problem has u -> 0 at infinity; a finite box can only approximate that.
//   InitialGuess : keep whatever the initial guess holds on the faces
//   Zero         : u = 0 on the faces (needs a lot of empty space around the source)
//   Multipole    : u from the monopole + dipole moments of the source,
//                    u(r) ≈ -(1/4π) ( q/|d| + (p·d)/|d|^3 ),  d = r - c
//                  with q = Σ f dV and p = Σ f (r - c) dV about the box centre c.

use std::f64::consts::PI;

use crate::geometry::AxisCoords;
use crate::grid::idx3;
use crate::params::BoundaryPolicy;
use crate::scalar_field::ScalarField3D;

/// Visit every point on the outer faces of an nx × ny × nz box exactly once.
pub fn for_each_boundary_point<F>(dims: [usize; 3], mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    let [nx, ny, nz] = dims;
    if nx == 0 || ny == 0 || nz == 0 {
        return;
    }
    for k in 0..nz {
        for j in 0..ny {
            if k == 0 || k + 1 == nz || j == 0 || j + 1 == ny {
                // Entire row lies on a y or z face.
                for i in 0..nx {
                    f(i, j, k);
                }
            } else {
                f(0, j, k);
                if nx > 1 {
                    f(nx - 1, j, k);
                }
            }
        }
    }
}

/// Overwrite the boundary of `phi` according to `policy`.
pub fn apply(
    policy: BoundaryPolicy,
    phi: &mut [f64],
    coords: &AxisCoords,
    source: &ScalarField3D,
    spacing: [f64; 3],
) {
    let dims = source.shape();
    let [nx, ny, _] = dims;
    match policy {
        BoundaryPolicy::InitialGuess => {}
        BoundaryPolicy::Zero => {
            for_each_boundary_point(dims, |i, j, k| phi[idx3(i, j, k, nx, ny)] = 0.0);
        }
        BoundaryPolicy::Multipole => {
            let far = FarField::from_source(coords, source, spacing);
            for_each_boundary_point(dims, |i, j, k| {
                phi[idx3(i, j, k, nx, ny)] = far.eval([coords.x[i], coords.y[j], coords.z[k]]);
            });
        }
    }
}

/// Monopole + dipole expansion of the free-space solution.
#[derive(Debug, Clone, Copy)]
pub struct FarField {
    pub center: [f64; 3],
    pub q: f64,
    pub p: [f64; 3],
}

impl FarField {
    pub fn from_source(coords: &AxisCoords, source: &ScalarField3D, spacing: [f64; 3]) -> Self {
        let dvol = spacing[0] * spacing[1] * spacing[2];
        let center = [
            0.5 * (coords.x[0] + coords.x[coords.x.len() - 1]),
            0.5 * (coords.y[0] + coords.y[coords.y.len() - 1]),
            0.5 * (coords.z[0] + coords.z[coords.z.len() - 1]),
        ];

        let mut q = 0.0f64;
        let mut p = [0.0f64; 3];
        for k in 0..source.nz {
            let z = coords.z[k] - center[2];
            for j in 0..source.ny {
                let y = coords.y[j] - center[1];
                for i in 0..source.nx {
                    let x = coords.x[i] - center[0];
                    let w = source.get(i, j, k) * dvol;
                    q += w;
                    p[0] += w * x;
                    p[1] += w * y;
                    p[2] += w * z;
                }
            }
        }
        Self { center, q, p }
    }

    pub fn eval(&self, r: [f64; 3]) -> f64 {
        let d = [
            r[0] - self.center[0],
            r[1] - self.center[1],
            r[2] - self.center[2],
        ];
        let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
        if r2 <= 0.0 {
            return 0.0;
        }
        let r = r2.sqrt();
        let pr = self.p[0] * d[0] + self.p[1] * d[1] + self.p[2] * d[2];
        -(self.q / r + pr / (r2 * r)) / (4.0 * PI)
    }
}

// src/geometry.rs
//
// Cube-grid geometry: origin + three voxel axis vectors.
//
// The Poisson solvers assume cubic voxels on a rectangular lattice, so the axes
// must be mutually orthogonal and of equal length. Axes do not have to be the
// Cartesian basis: `frame` holds the unit axes (rows) so vector components can be
// rotated into and out of the grid frame.

use serde::Serialize;

use crate::error::{Result, VecPotError};
use crate::grid::Grid3D;
use crate::vec3::{dot, norm, scale, triple};

/// One nucleus from a cube header. Carried through unchanged; never used numerically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Atom {
    pub atomic_number: u32,
    /// Nuclear charge column of the cube header (usually equal to the atomic number).
    pub charge: f64,
    pub position: [f64; 3],
}

/// Max |axis_a · axis_b| accepted as orthogonal.
pub const ORTHOGONALITY_TOL: f64 = 1.0e-10;
/// Max ||axis_a| - |axis_b|| accepted as isotropic.
pub const ISOTROPY_TOL: f64 = 1.0e-10;

/// Origin and voxel axes as stored in a cube header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridGeometry {
    pub origin: [f64; 3],
    pub axes: [[f64; 3]; 3],
}

/// Ascending sample coordinates along each grid axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCoords {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

/// A geometry that passed validation, with everything the numerical core needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGrid {
    pub grid: Grid3D,
    /// Unit axis vectors (rows).
    pub frame: [[f64; 3]; 3],
    /// +1 for a right-handed axis triple, -1 for a left-handed one.
    pub handedness: f64,
    pub coords: AxisCoords,
}

impl GridGeometry {
    pub fn new(origin: [f64; 3], axes: [[f64; 3]; 3]) -> Self {
        Self { origin, axes }
    }

    /// Axis-aligned cubic voxels of side `h`.
    pub fn cubic(origin: [f64; 3], h: f64) -> Self {
        Self::new(origin, [[h, 0.0, 0.0], [0.0, h, 0.0], [0.0, 0.0, h]])
    }

    /// Check orthogonality and isotropy; derive spacing, frame and coordinate vectors.
    pub fn validate(&self, dims: [usize; 3]) -> Result<ValidatedGrid> {
        let a = self.axes;

        for (p, q) in [(0usize, 1usize), (1, 2), (0, 2)] {
            let d = dot(a[p], a[q]);
            if !(d.abs() < ORTHOGONALITY_TOL) {
                return Err(VecPotError::InvalidGridGeometry(format!(
                    "axes {} and {} are not orthogonal (dot = {:.3e})",
                    p, q, d
                )));
            }
        }

        let h = [norm(a[0]), norm(a[1]), norm(a[2])];
        if h.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(VecPotError::InvalidGridGeometry(format!(
                "axis lengths must be positive and finite, got {:?}",
                h
            )));
        }
        if (h[0] - h[1]).abs() >= ISOTROPY_TOL || (h[0] - h[2]).abs() >= ISOTROPY_TOL {
            return Err(VecPotError::InvalidGridGeometry(format!(
                "voxels are not cubic: |axis| = {:.12}, {:.12}, {:.12}",
                h[0], h[1], h[2]
            )));
        }

        let frame = [
            scale(a[0], 1.0 / h[0]),
            scale(a[1], 1.0 / h[1]),
            scale(a[2], 1.0 / h[2]),
        ];
        let handedness = if triple(frame[0], frame[1], frame[2]) < 0.0 {
            -1.0
        } else {
            1.0
        };

        let grid = Grid3D::new(dims[0], dims[1], dims[2], h[0], h[1], h[2]);
        let coords = AxisCoords {
            x: axis_coords(dot(self.origin, frame[0]), h[0], dims[0]),
            y: axis_coords(dot(self.origin, frame[1]), h[1], dims[1]),
            z: axis_coords(dot(self.origin, frame[2]), h[2], dims[2]),
        };

        Ok(ValidatedGrid {
            grid,
            frame,
            handedness,
            coords,
        })
    }
}

impl ValidatedGrid {
    /// True when the axes are the positive Cartesian basis (no rotation needed).
    pub fn is_cartesian(&self) -> bool {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        self.frame
            .iter()
            .flatten()
            .zip(id.iter().flatten())
            .all(|(a, b)| (a - b).abs() < 1e-12)
    }

    /// Transpose of `frame`: maps grid-frame components back to Cartesian ones.
    pub fn frame_transposed(&self) -> [[f64; 3]; 3] {
        let f = self.frame;
        [
            [f[0][0], f[1][0], f[2][0]],
            [f[0][1], f[1][1], f[2][1]],
            [f[0][2], f[1][2], f[2][2]],
        ]
    }
}

/// origin + i*h for i in 0..n.
fn axis_coords(origin: f64, h: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| origin + i as f64 * h).collect()
}

impl AxisCoords {
    /// Coordinates of an axis-aligned grid starting at `origin`.
    pub fn uniform(origin: [f64; 3], grid: &Grid3D) -> Self {
        Self {
            x: axis_coords(origin[0], grid.dx, grid.nx),
            y: axis_coords(origin[1], grid.dy, grid.ny),
            z: axis_coords(origin[2], grid.dz, grid.nz),
        }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }

    pub fn axes(&self) -> [&[f64]; 3] {
        [&self.x, &self.y, &self.z]
    }

    /// Per-axis spacing. Every axis needs >= 2 strictly ascending, uniformly spaced samples.
    pub fn spacing(&self) -> Result<[f64; 3]> {
        let mut h = [0.0f64; 3];
        for (axis, v) in self.axes().into_iter().enumerate() {
            if v.len() < 2 {
                return Err(VecPotError::InsufficientGridSize {
                    axis,
                    len: v.len(),
                });
            }
            let step = v[1] - v[0];
            if !(step > 0.0) || !step.is_finite() {
                return Err(VecPotError::InvalidGridGeometry(format!(
                    "coordinates along axis {} must be strictly ascending",
                    axis
                )));
            }
            let tol = 1e-6 * step;
            if v.windows(2).any(|w| ((w[1] - w[0]) - step).abs() > tol) {
                return Err(VecPotError::InvalidGridGeometry(format!(
                    "coordinates along axis {} are not uniformly spaced",
                    axis
                )));
            }
            h[axis] = step;
        }
        Ok(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cartesian_grid_validates_with_expected_coords() {
        let g = GridGeometry::cubic([-1.0, 0.5, 2.0], 0.25);
        let v = g.validate([5, 3, 2]).unwrap();
        assert!(v.is_cartesian());
        assert_eq!(v.handedness, 1.0);
        assert_eq!(v.coords.x, vec![-1.0, -0.75, -0.5, -0.25, 0.0]);
        assert_eq!(v.coords.y, vec![0.5, 0.75, 1.0]);
        assert_eq!(v.coords.z, vec![2.0, 2.25]);
        assert_eq!(v.grid.dims(), [5, 3, 2]);
        assert_eq!(v.coords.spacing().unwrap(), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn non_orthogonal_axes_are_rejected() {
        let g = GridGeometry::new(
            [0.0; 3],
            [[1.0, 0.0, 0.0], [0.1, 1.0, 0.0], [0.0, 0.0, 1.0]],
        );
        let err = g.validate([4, 4, 4]).unwrap_err();
        assert!(matches!(err, VecPotError::InvalidGridGeometry(_)));
    }

    #[test]
    fn non_orthogonal_first_and_last_axes_are_rejected() {
        let g = GridGeometry::new(
            [0.0; 3],
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.2, 0.0, 1.0]],
        );
        assert!(g.validate([4, 4, 4]).is_err());
    }

    #[test]
    fn anisotropic_voxels_are_rejected() {
        let g = GridGeometry::new(
            [0.0; 3],
            [[0.2, 0.0, 0.0], [0.0, 0.2, 0.0], [0.0, 0.0, 0.2 + 1e-8]],
        );
        assert!(matches!(
            g.validate([4, 4, 4]),
            Err(VecPotError::InvalidGridGeometry(_))
        ));
    }

    #[test]
    fn zero_length_axes_are_rejected() {
        let g = GridGeometry::cubic([0.0; 3], 0.0);
        assert!(g.validate([4, 4, 4]).is_err());
    }

    #[test]
    fn left_handed_frame_is_detected() {
        let g = GridGeometry::new(
            [1.0, 2.0, 3.0],
            [[0.0, 0.5, 0.0], [0.5, 0.0, 0.0], [0.0, 0.0, 0.5]],
        );
        let v = g.validate([3, 3, 3]).unwrap();
        assert!(!v.is_cartesian());
        assert_eq!(v.handedness, -1.0);
        // First grid axis runs along Cartesian y.
        assert_eq!(v.coords.x[0], 2.0);
        assert_eq!(v.coords.y[0], 1.0);
    }

    #[test]
    fn spacing_rejects_non_uniform_coordinates() {
        let c = AxisCoords {
            x: vec![0.0, 1.0, 2.5],
            y: vec![0.0, 1.0],
            z: vec![0.0, 1.0],
        };
        assert!(matches!(
            c.spacing(),
            Err(VecPotError::InvalidGridGeometry(_))
        ));

        let c = AxisCoords {
            x: vec![0.0],
            y: vec![0.0, 1.0],
            z: vec![0.0, 1.0],
        };
        assert!(matches!(
            c.spacing(),
            Err(VecPotError::InsufficientGridSize { axis: 0, len: 1 })
        ));
    }
}

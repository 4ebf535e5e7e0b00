// src/grid.rs

/// Uniform 3D finite-difference grid: point counts and per-axis spacing.
///
/// Samples are stored flat with i (x) fastest, then j, then k.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Grid3D {
    pub fn new(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            dz,
        }
    }

    /// Cubic voxels of side `h`.
    pub fn cubic(nx: usize, ny: usize, nz: usize, h: f64) -> Self {
        Self::new(nx, ny, nz, h, h, h)
    }

    /// Total number of samples.
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Voxel volume dx*dy*dz.
    #[inline]
    pub fn dvol(&self) -> f64 {
        self.dx * self.dy * self.dz
    }

    /// Convert (i, j, k) indices to a flat index.
    #[inline]
    pub fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        idx3(i, j, k, self.nx, self.ny)
    }
}

#[inline]
pub fn idx3(i: usize, j: usize, k: usize, nx: usize, ny: usize) -> usize {
    (k * ny + j) * nx + i
}

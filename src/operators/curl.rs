// src/operators/curl.rs
//
// Curl of a sampled vector field M = (Mx, My, Mz):
//
//   rot_x = dMz/dy - dMy/dz
//   rot_y = dMx/dz - dMz/dx
//   rot_z = dMy/dx - dMx/dy

use super::gradient::gradient;
use crate::error::Result;
use crate::scalar_field::ScalarField3D;
use crate::vector_field::VectorField3D;

use rayon::prelude::*;

/// Curl of (mx, my, mz) with grid spacings (dx, dy, dz).
///
/// Fails with `ShapeMismatch` if the components differ in shape, and with the
/// differentiator's errors for too-small grids or bad spacing.
pub fn curl(
    mx: &ScalarField3D,
    my: &ScalarField3D,
    mz: &ScalarField3D,
    spacing: [f64; 3],
) -> Result<VectorField3D> {
    mx.ensure_same_shape(my)?;
    mx.ensure_same_shape(mz)?;

    // Diagonal terms do not enter the curl.
    let [_, dmx_dy, dmx_dz] = gradient(mx, spacing)?;
    let [dmy_dx, _, dmy_dz] = gradient(my, spacing)?;
    let [dmz_dx, dmz_dy, _] = gradient(mz, spacing)?;

    Ok(VectorField3D {
        x: difference(&dmz_dy, &dmy_dz),
        y: difference(&dmx_dz, &dmz_dx),
        z: difference(&dmy_dx, &dmx_dy),
    })
}

/// Curl of a bundled vector field.
pub fn curl_field(m: &VectorField3D, spacing: [f64; 3]) -> Result<VectorField3D> {
    curl(&m.x, &m.y, &m.z, spacing)
}

fn difference(a: &ScalarField3D, b: &ScalarField3D) -> ScalarField3D {
    let mut out = ScalarField3D::zeros_like(a);
    out.data
        .par_iter_mut()
        .zip(a.data.par_iter().zip(b.data.par_iter()))
        .for_each(|(o, (x, y))| *o = x - y);
    out
}

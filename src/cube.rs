// src/cube.rs
//
// Gaussian cube files: a molecular geometry header followed by scalar samples on a
// uniform grid.
//
//   line 1-2 : free-form comments
//   line 3   : natoms  ox oy oz
//   line 4-6 : n_a     axis_a (x y z)        a = 0, 1, 2
//   natoms x : Z  charge  x y z
//   (natoms < 0: one extra line "nmo idx..." follows the atoms)
//   data     : n0*n1*n2 values, third index fastest, whitespace separated
//
// A negative point count means the axis vectors are given in Ångström; they are
// converted to bohr on read. Files are always written in bohr.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, VecPotError};
use crate::geometry::{Atom, GridGeometry};
use crate::grid::idx3;
use crate::scalar_field::ScalarField3D;

/// Bohr radius in Ångström (CODATA 2018).
pub const BOHR_IN_ANGSTROM: f64 = 0.529_177_210_903;

/// Everything one cube file holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeData {
    pub title: String,
    pub comment: String,
    pub atoms: Vec<Atom>,
    pub geometry: GridGeometry,
    pub field: ScalarField3D,
}

impl CubeData {
    /// Same header (atoms, origin, axes), different samples.
    pub fn with_field(&self, field: ScalarField3D, comment: &str) -> Self {
        Self {
            title: self.title.clone(),
            comment: comment.to_string(),
            atoms: self.atoms.clone(),
            geometry: self.geometry,
            field,
        }
    }
}

pub fn read_cube(path: &Path) -> Result<CubeData> {
    let text = std::fs::read_to_string(path)?;
    parse_cube(&text).map_err(|msg| VecPotError::CubeFormat {
        path: path.to_path_buf(),
        msg,
    })
}

/// Parse cube text. Errors are plain messages; `read_cube` attaches the path.
pub fn parse_cube(text: &str) -> std::result::Result<CubeData, String> {
    let mut lines = text.lines();
    let title = lines.next().ok_or("missing title line")?.trim().to_string();
    let comment = lines.next().ok_or("missing comment line")?.trim().to_string();

    let head = numbers(lines.next().ok_or("missing atom count / origin line")?, 4)?;
    let natoms_signed = as_int(head[0], "atom count")?;
    let natoms = natoms_signed.unsigned_abs() as usize;
    let origin = [head[1], head[2], head[3]];

    let mut dims = [0usize; 3];
    let mut axes = [[0.0f64; 3]; 3];
    for a in 0..3 {
        let v = numbers(lines.next().ok_or("missing axis line")?, 4)?;
        let n = as_int(v[0], "point count")?;
        if n == 0 {
            return Err(format!("axis {} has zero points", a));
        }
        // Negative count: axis in Ångström.
        let unit = if n < 0 { 1.0 / BOHR_IN_ANGSTROM } else { 1.0 };
        dims[a] = n.unsigned_abs() as usize;
        axes[a] = [v[1] * unit, v[2] * unit, v[3] * unit];
    }

    let mut atoms = Vec::with_capacity(natoms);
    for n in 0..natoms {
        let v = numbers(
            lines
                .next()
                .ok_or_else(|| format!("missing atom line {}", n + 1))?,
            5,
        )?;
        let z = as_int(v[0], "atomic number")?;
        if z < 0 {
            return Err(format!("negative atomic number on atom line {}", n + 1));
        }
        atoms.push(Atom {
            atomic_number: z as u32,
            charge: v[1],
            position: [v[2], v[3], v[4]],
        });
    }

    if natoms_signed < 0 {
        // Orbital header: "nmo idx1 idx2 ..."; only single-orbital files are supported.
        let mo_line = lines.next().ok_or("missing orbital index line")?;
        let nmo = mo_line
            .split_whitespace()
            .next()
            .ok_or("empty orbital index line")?;
        let nmo = parse_f64(nmo)?;
        if nmo != 1.0 {
            return Err(format!(
                "cube holds {} orbitals per point; only one is supported",
                nmo
            ));
        }
    }

    let [nx, ny, nz] = dims;
    let n_expected = nx
        .checked_mul(ny)
        .and_then(|p| p.checked_mul(nz))
        .ok_or_else(|| format!("grid too large: {}x{}x{} points", nx, ny, nz))?;
    // Count before allocating so a bogus header cannot request a huge field.
    let tokens: Vec<&str> = lines.flat_map(str::split_whitespace).collect();
    if tokens.len() != n_expected {
        return Err(format!(
            "expected {} samples ({}x{}x{}), found {}",
            n_expected,
            nx,
            ny,
            nz,
            tokens.len()
        ));
    }

    let mut field = ScalarField3D::zeros(nx, ny, nz);
    for (count, tok) in tokens.into_iter().enumerate() {
        // File order: i slowest, k fastest.
        let k = count % nz;
        let j = (count / nz) % ny;
        let i = count / (ny * nz);
        field.data[idx3(i, j, k, nx, ny)] = parse_f64(tok)?;
    }

    Ok(CubeData {
        title,
        comment,
        atoms,
        geometry: GridGeometry::new(origin, axes),
        field,
    })
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn write_cube(path: &Path, cube: &CubeData) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut w = BufWriter::new(File::create(path)?);
    write_cube_to(&mut w, cube)?;
    w.flush()?;
    Ok(())
}

/// Write cube text to any writer (six samples per line, new line after each z-run).
pub fn write_cube_to<W: Write>(w: &mut W, cube: &CubeData) -> std::io::Result<()> {
    let [nx, ny, nz] = cube.field.shape();
    let o = cube.geometry.origin;
    let ax = cube.geometry.axes;

    writeln!(w, "{}", single_line(&cube.title))?;
    writeln!(w, "{}", single_line(&cube.comment))?;
    writeln!(
        w,
        "{:5} {:12.6} {:12.6} {:12.6}",
        cube.atoms.len(),
        o[0],
        o[1],
        o[2]
    )?;
    for (n, a) in [nx, ny, nz].iter().zip(ax.iter()) {
        writeln!(w, "{:5} {:12.6} {:12.6} {:12.6}", n, a[0], a[1], a[2])?;
    }
    for atom in &cube.atoms {
        writeln!(
            w,
            "{:5} {:12.6} {:12.6} {:12.6} {:12.6}",
            atom.atomic_number, atom.charge, atom.position[0], atom.position[1], atom.position[2]
        )?;
    }

    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                write!(w, " {}", format_e(cube.field.data[idx3(i, j, k, nx, ny)]))?;
                if k % 6 == 5 || k + 1 == nz {
                    writeln!(w)?;
                }
            }
        }
    }
    Ok(())
}

/// C-style `%12.5E`: mantissa with 5 decimals, signed two-digit exponent.
fn format_e(v: f64) -> String {
    let s = format!("{:.5E}", v);
    match s.split_once('E') {
        Some((mant, exp)) => match exp.parse::<i32>() {
            Ok(e) => format!(
                "{:>12}",
                format!("{}E{}{:02}", mant, if e < 0 { '-' } else { '+' }, e.abs())
            ),
            Err(_) => format!("{:>12}", s),
        },
        // inf / NaN
        None => format!("{:>12}", s),
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

fn numbers(line: &str, min: usize) -> std::result::Result<Vec<f64>, String> {
    let v = line
        .split_whitespace()
        .map(parse_f64)
        .collect::<std::result::Result<Vec<f64>, String>>()?;
    if v.len() < min {
        return Err(format!(
            "expected at least {} numbers, found {} in line '{}'",
            min,
            v.len(),
            line.trim()
        ));
    }
    Ok(v)
}

fn parse_f64(tok: &str) -> std::result::Result<f64, String> {
    // Fortran writers sometimes use D exponents.
    let v = tok
        .replace(['D', 'd'], "E")
        .parse::<f64>()
        .map_err(|_| format!("not a number: '{}'", tok))?;
    if !v.is_finite() {
        return Err(format!("non-finite value: '{}'", tok));
    }
    Ok(v)
}

fn as_int(v: f64, what: &str) -> std::result::Result<i64, String> {
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(format!("{} must be an integer, got {}", what, v));
    }
    Ok(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
 test cube
 Mx component
    2    -1.000000    -1.000000    -1.000000
    2     0.500000     0.000000     0.000000
    2     0.000000     0.500000     0.000000
    3     0.000000     0.000000     0.500000
    1     1.000000     0.000000     0.000000     0.000000
    8     8.000000     0.000000     0.000000     1.400000
  0.0 1.0 2.0 3.0 4.0 5.0
  6.0 7.0 8.0 9.0 1.0D1 1.1E1
";

    #[test]
    fn parses_header_atoms_and_data_order() {
        let c = parse_cube(SMALL).unwrap();
        assert_eq!(c.title, "test cube");
        assert_eq!(c.atoms.len(), 2);
        assert_eq!(c.atoms[1].atomic_number, 8);
        assert_eq!(c.atoms[1].position, [0.0, 0.0, 1.4]);
        assert_eq!(c.geometry.origin, [-1.0, -1.0, -1.0]);
        assert_eq!(c.field.shape(), [2, 2, 3]);
        // File order is (i, j, k) with k fastest.
        assert_eq!(c.field.get(0, 0, 2), 2.0);
        assert_eq!(c.field.get(0, 1, 0), 3.0);
        assert_eq!(c.field.get(1, 0, 0), 6.0);
        assert_eq!(c.field.get(1, 1, 1), 10.0);
        assert_eq!(c.field.get(1, 1, 2), 11.0);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let text = SMALL.replace(" 1.0D1 1.1E1", "");
        let err = parse_cube(&text).unwrap_err();
        assert!(err.contains("expected 12 samples"), "{}", err);
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        for bad in ["NaN", "inf", "-inf"] {
            let text = SMALL.replace("1.1E1", bad);
            let err = parse_cube(&text).unwrap_err();
            assert!(err.contains("non-finite"), "{}", err);
        }
    }

    #[test]
    fn overflowing_point_counts_are_rejected() {
        let text = "\
 huge
 grid
    0     0.000000     0.000000     0.000000
 4000000000     0.100000     0.000000     0.000000
 4000000000     0.000000     0.100000     0.000000
 4000000000     0.000000     0.000000     0.100000
  1.0 2.0
";
        let err = parse_cube(text).unwrap_err();
        assert!(err.contains("grid too large"), "{}", err);
    }

    #[test]
    fn point_counts_are_checked_against_the_data_before_allocating() {
        let text = SMALL
            .replacen("    2     0.500000     0.000000", "  100000     0.500000     0.000000", 1)
            .replacen("    2     0.000000     0.500000", "  100000     0.000000     0.500000", 1);
        let err = parse_cube(&text).unwrap_err();
        assert!(err.contains("expected 30000000000 samples"), "{}", err);
    }

    #[test]
    fn angstrom_axes_are_converted_to_bohr() {
        let text = SMALL.replacen("    2     0.500000     0.000000", "   -2     0.500000     0.000000", 1);
        let c = parse_cube(&text).unwrap();
        assert!((c.geometry.axes[0][0] - 0.5 / BOHR_IN_ANGSTROM).abs() < 1e-12);
        assert_eq!(c.field.shape()[0], 2);
    }

    #[test]
    fn exponent_format_matches_c_style() {
        assert_eq!(format_e(1.0).trim(), "1.00000E+00");
        assert_eq!(format_e(-2.5e-7).trim(), "-2.50000E-07");
        assert_eq!(format_e(0.0).trim(), "0.00000E+00");
        assert_eq!(format_e(1.0).len(), 12);
    }
}

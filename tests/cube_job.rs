// tests/cube_job.rs
//
// Cube-file boundary and the file-to-file job:
// - write/read keeps atoms, geometry and samples (to the 6 significant digits of the format)
// - a full job writes three output cubes with the Mx header
// - strict mode with an unconverged solve writes nothing

use std::path::{Path, PathBuf};

use vecpot::VecPotError;
use vecpot::cube::{CubeData, read_cube, write_cube};
use vecpot::geometry::{Atom, GridGeometry};
use vecpot::job::CubeJob;
use vecpot::params::{BoundaryPolicy, SolverConfig, Units};
use vecpot::scalar_field::ScalarField3D;

fn sample_cube(field: ScalarField3D) -> CubeData {
    CubeData {
        title: "magnetic dipole density".to_string(),
        comment: "Mx".to_string(),
        atoms: vec![
            Atom {
                atomic_number: 6,
                charge: 6.0,
                position: [0.1, -0.2, 0.3],
            },
            Atom {
                atomic_number: 1,
                charge: 1.0,
                position: [2.0, 0.0, -1.25],
            },
        ],
        geometry: GridGeometry::cubic([-1.5, -1.25, -1.0], 0.25),
        field,
    }
}

fn smooth_field(n: [usize; 3], amp: f64) -> ScalarField3D {
    ScalarField3D::from_fn(n[0], n[1], n[2], |i, j, k| {
        let x = i as f64 - 0.5 * (n[0] - 1) as f64;
        let y = j as f64 - 0.5 * (n[1] - 1) as f64;
        let z = k as f64 - 0.5 * (n[2] - 1) as f64;
        amp * (-(x * x + y * y + z * z) / 4.0).exp()
    })
}

fn paths(dir: &Path, names: [&str; 3]) -> [PathBuf; 3] {
    names.map(|n| dir.join(n))
}

#[test]
fn cube_write_read_cycle_keeps_header_and_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("m.cube");
    let field = ScalarField3D::from_fn(4, 3, 7, |i, j, k| {
        (i as f64 + 1.0) * 1e-3 - (j as f64) * 0.7 + (k as f64).powi(3) * 1e4
    });
    let cube = sample_cube(field);

    write_cube(&path, &cube).unwrap();
    let back = read_cube(&path).unwrap();

    assert_eq!(back.title, cube.title);
    assert_eq!(back.comment, cube.comment);
    assert_eq!(back.atoms, cube.atoms);
    assert_eq!(back.geometry, cube.geometry);
    assert_eq!(back.field.shape(), [4, 3, 7]);
    for (a, b) in back.field.data.iter().zip(cube.field.data.iter()) {
        assert!((a - b).abs() <= 1e-5 * b.abs() + 1e-300, "{} vs {}", a, b);
    }
}

#[test]
fn malformed_cube_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.cube");
    std::fs::write(&path, "title\ncomment\n  1  0.0 0.0\n").unwrap();
    match read_cube(&path) {
        Err(VecPotError::CubeFormat { path: p, msg }) => {
            assert_eq!(p, path);
            assert!(msg.contains("expected at least 4 numbers"), "{}", msg);
        }
        other => panic!("expected CubeFormat error, got {:?}", other.map(|c| c.title)),
    }
}

#[test]
fn job_writes_three_potential_cubes() {
    let dir = tempfile::tempdir().unwrap();
    let n = [7, 7, 7];
    let inputs = paths(dir.path(), ["mx.cube", "my.cube", "mz.cube"]);
    let outputs = paths(dir.path(), ["ax.cube", "ay.cube", "az.cube"]);

    let mut template = sample_cube(smooth_field(n, 0.0));
    template.geometry = GridGeometry::cubic([-0.75; 3], 0.25);
    for (path, amp) in inputs.iter().zip([0.0, 0.0, 1.0]) {
        write_cube(path, &template.with_field(smooth_field(n, amp), "M")).unwrap();
    }

    let mut cfg = SolverConfig::iterative();
    cfg.conv_eps = 1e-9;
    cfg.maxiter = 10_000;
    cfg.boundary = BoundaryPolicy::Multipole;
    let outcome = CubeJob::new(inputs.clone(), outputs.clone())
        .run(&cfg, Units::atomic())
        .unwrap();
    assert!(outcome.potential.all_converged());
    assert!(outcome.potential.magnetic_dipole[2] > 0.0);

    let ax = read_cube(&outputs[0]).unwrap();
    let ay = read_cube(&outputs[1]).unwrap();
    let az = read_cube(&outputs[2]).unwrap();
    for c in [&ax, &ay, &az] {
        assert_eq!(c.atoms, template.atoms);
        assert_eq!(c.geometry, template.geometry);
        assert_eq!(c.field.shape(), n);
    }
    // M along z only: no A_z, and A_x / A_y carry the circulation.
    assert_eq!(az.field.max_abs(), 0.0);
    assert!(ax.field.max_abs() > 0.0);
    assert!(ay.field.max_abs() > 0.0);
}

#[test]
fn strict_job_without_convergence_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let n = [6, 6, 6];
    let inputs = paths(dir.path(), ["mx.cube", "my.cube", "mz.cube"]);
    let outputs = paths(dir.path(), ["ax.cube", "ay.cube", "az.cube"]);
    for (path, amp) in inputs.iter().zip([1.0, -0.5, 0.25]) {
        write_cube(path, &sample_cube(smooth_field(n, amp))).unwrap();
    }

    let mut cfg = SolverConfig::iterative();
    cfg.conv_eps = 1e-15;
    cfg.maxiter = 2;

    let err = CubeJob::new(inputs, outputs.clone())
        .with_strict(true)
        .run(&cfg, Units::atomic())
        .unwrap_err();
    assert!(matches!(err, VecPotError::NonConvergence { .. }), "{}", err);
    assert!(outputs.iter().all(|p| !p.exists()));
}

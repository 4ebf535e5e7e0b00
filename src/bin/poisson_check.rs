// src/bin/poisson_check.rs
//
// Compare the Poisson backends against the analytic potential of a Gaussian charge:
//   (1) FFT free-space convolution ("pspfft", needs the `spectral` feature)
//   (2) Jacobi relaxation ("iterative") with multipole boundary values
//
// Usage:
//   cargo run --release --bin poisson_check
//   cargo run --release --bin poisson_check -- 49 0.2 --sigma 1.5 --boundary zero
//
// Defaults: n=33 h=0.25 sigma=1.0 conv-eps=1e-9 maxiter=100000 boundary=multipole.
// The grid is centred on the charge. Reported errors are max |u - u_exact| over the
// whole grid and relative to u_exact at the centre.

use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vecpot::geometry::GridGeometry;
use vecpot::params::{BoundaryPolicy, PoissonMethod, SolverConfig};
use vecpot::poisson::analytic::GaussianCharge;
use vecpot::poisson::{PoissonSolver, SolveControl, resolve_backend, spectral_available};
use vecpot::scalar_field::ScalarField3D;

#[derive(Parser, Debug)]
#[command(name = "poisson_check")]
#[command(about = "Compare the Poisson backends against a Gaussian charge")]
struct Args {
    /// Grid points per axis
    #[arg(default_value = "33")]
    n: usize,
    /// Grid spacing (bohr)
    #[arg(default_value = "0.25")]
    h: f64,

    /// Width of the Gaussian charge
    #[arg(long, default_value = "1.0")]
    sigma: f64,

    /// Convergence threshold of the iterative backend
    #[arg(long, default_value = "1e-9")]
    conv_eps: f64,

    /// Iteration cap of the iterative backend
    #[arg(long, default_value = "100000")]
    maxiter: usize,

    /// Boundary values of the iterative backend: guess, zero or multipole
    #[arg(long, default_value = "multipole")]
    boundary: BoundaryPolicy,
}

fn run_backend(
    backend: &dyn PoissonSolver,
    geometry: &GridGeometry,
    n: usize,
    source: &ScalarField3D,
    exact: &ScalarField3D,
) {
    let vg = match geometry.validate([n, n, n]) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("invalid grid: {}", e);
            std::process::exit(1);
        }
    };
    let guess = ScalarField3D::zeros_like(source);

    let t0 = Instant::now();
    let sol = match backend.solve(&vg.coords, source, &guess, &SolveControl::new()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: solve failed: {}", backend.name(), e);
            return;
        }
    };
    let elapsed = t0.elapsed().as_secs_f64();

    let err = sol.field.max_abs_diff(exact);
    let c = n / 2;
    let u_c = exact.get(c, c, c);
    println!(
        "{:<10} time={:>8.3}s  iterations={:>7}  converged={:<5}  max|err|={:.3e}  rel(centre)={:.3e}  u(c)={:.6} (exact {:.6})",
        backend.name(),
        elapsed,
        sol.report.iterations,
        sol.report.converged,
        err,
        err / u_c.abs(),
        sol.field.get(c, c, c),
        u_c,
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let (n, h, sigma) = (args.n, args.h, args.sigma);
    if n < 3 || !(h > 0.0) || !(sigma > 0.0) {
        eprintln!("need n >= 3, h > 0 and sigma > 0");
        std::process::exit(2);
    }

    let half = 0.5 * (n - 1) as f64 * h;
    let geometry = GridGeometry::cubic([-half, -half, -half], h);
    let coords = match geometry.validate([n, n, n]) {
        Ok(v) => v.coords,
        Err(e) => {
            eprintln!("invalid grid: {}", e);
            std::process::exit(1);
        }
    };
    let charge = GaussianCharge::new([0.0; 3], sigma);
    let source = charge.source(&coords);
    let exact = charge.exact(&coords);

    println!(
        "Gaussian charge: sigma={} grid={}^3 h={} box=[{:.3}, {:.3}]^3  (sum rho dV = {:.6})",
        sigma,
        n,
        h,
        -half,
        half,
        -source.sum() * h * h * h / (4.0 * std::f64::consts::PI),
    );

    let mut methods = vec![PoissonMethod::Iterative];
    if spectral_available() {
        methods.insert(0, PoissonMethod::Spectral);
    } else {
        println!("pspfft     skipped (built without the `spectral` feature)");
    }

    for method in methods {
        let cfg = SolverConfig {
            method,
            conv_eps: args.conv_eps,
            maxiter: args.maxiter,
            boundary: args.boundary,
            history_stride: 0,
            ..SolverConfig::default()
        };
        match resolve_backend(&cfg) {
            Ok(backend) => run_backend(backend.as_ref(), &geometry, n, &source, &exact),
            Err(e) => eprintln!("{}: {}", method.as_str(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_flags_parse() {
        let a = Args::try_parse_from(["poisson_check"]).unwrap();
        assert_eq!((a.n, a.h, a.sigma), (33, 0.25, 1.0));
        assert_eq!(a.boundary, BoundaryPolicy::Multipole);

        let a = Args::try_parse_from(["poisson_check", "49", "0.2", "--boundary", "zero", "--maxiter", "10"])
            .unwrap();
        assert_eq!((a.n, a.h, a.maxiter), (49, 0.2, 10));
        assert_eq!(a.boundary, BoundaryPolicy::Zero);

        assert!(Args::try_parse_from(["poisson_check", "--boundary", "mirror"]).is_err());
    }
}

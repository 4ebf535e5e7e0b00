// src/main.rs
//
// Command-line driver: vector potential A of a magnetic dipole density M given as
// three cube files (Mx, My, Mz), written as three cube files (Ax, Ay, Az).
//
// Examples:
//
//   cargo run --release -- mx.cube my.cube mz.cube ax.cube ay.cube az.cube
//       -> FFT free-space Poisson solves (default "pspfft" backend).
//
//   cargo run --release -- mx.cube my.cube mz.cube ax.cube ay.cube az.cube \
//         --solver iterative --conv-eps 1e-8 --maxiter 200000 --boundary multipole \
//         --report runs/report.json --convergence-plot runs/convergence.svg
//       -> Jacobi relaxation with far-field boundary values, plus a JSON run
//          report and an SVG of the update-norm history.
//
// Logging goes through `tracing`; set RUST_LOG (e.g. RUST_LOG=vecpot=debug) for
// per-solve progress.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vecpot::config::{IoConfig, RunReport};
use vecpot::job::CubeJob;
use vecpot::params::{BoundaryPolicy, PoissonMethod, SolverConfig, Units};
use vecpot::vector_potential::VectorPotentialSolver;
use vecpot::visualisation::save_convergence_plot;

#[derive(Parser, Debug)]
#[command(name = "vecpot")]
#[command(about = "Vector potential A of a magnetic dipole density M on a cube grid")]
#[command(version)]
struct Args {
    /// Input cube file with the x-component of M
    mx: PathBuf,
    /// Input cube file with the y-component of M
    my: PathBuf,
    /// Input cube file with the z-component of M
    mz: PathBuf,
    /// Output cube file for the x-component of A
    ax: PathBuf,
    /// Output cube file for the y-component of A
    ay: PathBuf,
    /// Output cube file for the z-component of A
    az: PathBuf,

    /// Poisson solver: 'pspfft' (FFT, free space) or 'iterative' (Jacobi)
    #[arg(long, default_value = "pspfft")]
    solver: String,

    /// Convergence threshold on the max-norm of the iterative update
    #[arg(long, default_value = "1e-10")]
    conv_eps: f64,

    /// Maximum number of iterations of the iterative solver
    #[arg(long, default_value = "1000000")]
    maxiter: usize,

    /// Boundary values of the iterative solver: guess, zero or multipole
    #[arg(long, default_value = "guess")]
    boundary: String,

    /// Abort a component solve after this many seconds (each component has its own budget)
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Solve the three components one after another
    #[arg(long)]
    serial: bool,

    /// Fail (and write nothing) if any iterative solve does not converge
    #[arg(long)]
    strict: bool,

    /// Write a JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write an SVG of the iterative convergence history here
    #[arg(long)]
    convergence_plot: Option<PathBuf>,

    /// Record the update norm every N sweeps (0 disables)
    #[arg(long, default_value = "100")]
    history_stride: usize,
}

fn solver_config(args: &Args) -> Result<SolverConfig> {
    let method: PoissonMethod = args
        .solver
        .parse()
        .with_context(|| format!("Invalid --solver {:?}", args.solver))?;
    let boundary: BoundaryPolicy = args
        .boundary
        .parse()
        .with_context(|| format!("Invalid --boundary {:?}", args.boundary))?;
    let timeout = match args.timeout_secs {
        Some(t) if t.is_finite() && t > 0.0 => Some(Duration::from_secs_f64(t)),
        Some(t) => anyhow::bail!("--timeout-secs must be a positive number, got {}", t),
        None => None,
    };
    let cfg = SolverConfig {
        method,
        conv_eps: args.conv_eps,
        maxiter: args.maxiter,
        boundary,
        history_stride: args.history_stride,
        timeout,
        parallel_components: !args.serial,
    };
    cfg.validate().context("Invalid solver settings")?;
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = solver_config(&args)?;
    let units = Units::atomic();

    let job = CubeJob::new(
        [args.mx.clone(), args.my.clone(), args.mz.clone()],
        [args.ax.clone(), args.ay.clone(), args.az.clone()],
    )
    .with_strict(args.strict);

    let solver = VectorPotentialSolver::from_config(&cfg, units)
        .context("Cannot set up the Poisson solver")?;
    info!(
        solver = solver.backend_name(),
        conv_eps = cfg.conv_eps,
        maxiter = cfg.maxiter,
        "starting"
    );
    let outcome = job
        .run_with(&solver)
        .context("Vector potential computation failed")?;

    let d = outcome.potential.magnetic_dipole;
    println!(
        "magnetic dipole (au): {:+.8e} {:+.8e} {:+.8e}",
        d[0], d[1], d[2]
    );
    for (c, r) in ["x", "y", "z"].iter().zip(outcome.potential.reports.iter()) {
        println!(
            "A_{}: backend={} converged={} iterations={} last_update={:.3e}",
            c, r.backend, r.converged, r.iterations, r.final_update
        );
    }
    if !outcome.potential.all_converged() {
        warn!("at least one component did not converge; results are best estimates");
    }

    if let Some(path) = &args.report {
        let io = IoConfig {
            inputs: job.inputs.clone(),
            outputs: job.outputs.clone(),
        };
        RunReport::new(io, &cfg, units, &outcome.potential, "vecpot", outcome.elapsed_secs)
            .write_json(path)
            .with_context(|| format!("Failed to write run report: {:?}", path))?;
        info!(path = %path.display(), "run report written");
    }

    if let Some(path) = &args.convergence_plot {
        let filename = path
            .to_str()
            .with_context(|| format!("Plot path is not valid UTF-8: {:?}", path))?;
        let wrote = save_convergence_plot(&outcome.potential.reports, filename)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to write convergence plot: {:?}", path))?;
        if !wrote {
            warn!("no convergence history recorded (direct solver or --history-stride 0); plot skipped");
        }
    }

    Ok(())
}

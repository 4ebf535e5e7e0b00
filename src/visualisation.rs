// src/visualisation.rs
//
// Convergence plot for the iterative Poisson solver: max-norm of the Jacobi update
// vs sweep number, one line per vector-potential component, log y axis.

use crate::poisson::SolveReport;
use plotters::prelude::*;

const COMPONENT_COLOURS: [RGBColor; 3] = [RED, GREEN, BLUE];
const COMPONENT_LABELS: [&str; 3] = ["A_x", "A_y", "A_z"];

/// Write an SVG of the update-norm histories in `reports` (x, y, z order).
///
/// Reports without history (direct solves, or sampling disabled) are skipped; if none
/// has any, nothing is written and `Ok(false)` is returned.
pub fn save_convergence_plot(
    reports: &[SolveReport],
    filename: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let points: Vec<Vec<(f64, f64)>> = reports
        .iter()
        .map(|r| {
            r.history
                .iter()
                .filter(|(_, u)| u.is_finite() && *u > 0.0)
                .map(|&(it, u)| (it as f64, u))
                .collect()
        })
        .collect();

    if points.iter().all(|p| p.is_empty()) {
        return Ok(false);
    }

    let mut it_max = 1.0f64;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(it, u) in points.iter().flatten() {
        it_max = it_max.max(it);
        y_min = y_min.min(u);
        y_max = y_max.max(u);
    }
    // Show the threshold line even if the run stopped above it.
    if let Some(eps) = reports.iter().map(|r| r.conv_eps).find(|e| *e > 0.0) {
        y_min = y_min.min(eps);
    }
    // Half a decade of margin on both ends.
    y_min /= 3.0;
    y_max *= 3.0;

    let root = SVGBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Jacobi update norm vs sweep", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(70)
        .build_cartesian_2d(0.0..it_max, (y_min..y_max).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("sweep")
        .y_desc("max |u_new − u_old|")
        .y_label_formatter(&|v: &f64| format!("{:.0e}", v))
        .draw()?;

    for (c, pts) in points.iter().enumerate() {
        if pts.is_empty() {
            continue;
        }
        let colour = COMPONENT_COLOURS[c % 3];
        chart
            .draw_series(LineSeries::new(pts.iter().copied(), &colour))?
            .label(COMPONENT_LABELS[c % 3])
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }

    if let Some(eps) = reports.iter().map(|r| r.conv_eps).find(|e| *e > 0.0) {
        chart
            .draw_series(LineSeries::new(
                vec![(0.0, eps), (it_max, eps)],
                BLACK.mix(0.5),
            ))?
            .label("conv_eps")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.mix(0.5)));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(true)
}

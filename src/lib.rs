pub mod entry;
pub mod error;
pub mod io;
pub mod processing;
pub mod python_bind;
pub mod render;
pub mod report;
mod utils;

use nalgebra::Point3;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;
use tracing_subscriber::EnvFilter;

use entry::{compare_structure_sets, run_overlay};
use io::config::OverlayConfig;
use processing::{transform_contour, Orientation, PixelSpacing, SliceGeometry};
use python_bind::{PyOverlayResult, PyPixelContour};
use render::Raster;

/// Installs a `tracing` subscriber for the process. Honours `RUST_LOG` and
/// defaults to `info`; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Maps physical points onto the pixel grid of a slice.
///
/// `orientation` holds the six direction cosines (column direction first);
/// leave it out for an axis-aligned slice.
#[pyfunction]
#[pyo3(signature = (points, origin, spacing, rows, columns, orientation = None))]
fn transform_points_py(
    points: Vec<(f64, f64, f64)>,
    origin: (f64, f64, f64),
    spacing: (f64, f64),
    rows: u32,
    columns: u32,
    orientation: Option<[f64; 6]>,
) -> PyResult<Vec<(f64, f64)>> {
    let mut geometry = SliceGeometry::axis_aligned(
        "python",
        Point3::new(origin.0, origin.1, origin.2),
        PixelSpacing::new(spacing.0, spacing.1),
        rows,
        columns,
    );
    if let Some(cosines) = orientation {
        geometry = geometry.with_orientation(Orientation::from_cosines(cosines));
    }
    let physical: Vec<Point3<f64>> = points
        .into_iter()
        .map(|(x, y, z)| Point3::new(x, y, z))
        .collect();
    let out = transform_contour(&physical, &geometry)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
    Ok(out.into_iter().map(|p| (p.x, p.y)).collect())
}

/// Runs the overlay pipeline described by a TOML config file.
///
/// `raster` optionally carries the target slice's pixel values in row-major
/// order; the overlay is drawn on black otherwise.
#[pyfunction]
#[pyo3(signature = (config_path, raster = None))]
fn run_overlay_py(config_path: &str, raster: Option<(u32, u32, Vec<f64>)>) -> PyResult<PyOverlayResult> {
    let config = OverlayConfig::from_path(config_path)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
    let raster = raster
        .map(|(rows, columns, samples)| Raster::new(rows, columns, samples))
        .transpose()
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;

    let outcome = run_overlay(&config, raster.as_ref())
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok(outcome.into())
}

/// Writes the region catalogs of two structure-set files side by side to
/// `out_csv` and returns the rows as `(left, right)` pairs, `None` marking
/// the padding of the shorter catalog.
#[pyfunction]
#[pyo3(signature = (file1, file2, out_csv = "roi_comparison.csv"))]
fn compare_structure_sets_py(
    file1: &str,
    file2: &str,
    out_csv: &str,
) -> PyResult<Vec<(Option<(u32, String)>, Option<(u32, String)>)>> {
    let rows = compare_structure_sets(file1, file2, out_csv)
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok(rows.into_iter().map(|r| (r.left, r.right)).collect())
}

/// This is the module importable from Python:
///
/// ```python
/// import rtcontours as rt
/// result = rt.run_overlay_py("overlay.toml")
/// for c in result.contours:
///     xs, ys = c.xy()
/// ```
#[pymodule]
fn rtcontours(m: &Bound<'_, PyModule>) -> PyResult<()> {
    init_logging();
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(transform_points_py, m)?)?;
    m.add_function(wrap_pyfunction!(run_overlay_py, m)?)?;
    m.add_function(wrap_pyfunction!(compare_structure_sets_py, m)?)?;

    m.add_class::<PyPixelContour>()?;
    m.add_class::<PyOverlayResult>()?;
    Ok(())
}

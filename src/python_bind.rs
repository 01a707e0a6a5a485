// File: src/python_bind.rs
use pyo3::prelude::*;

use crate::entry::{OverlayOutcome, SlicePlot};

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyPixelContour {
    #[pyo3(get, set)]
    pub region_number: u32,
    #[pyo3(get, set)]
    pub region_name: String,
    #[pyo3(get, set)]
    pub points: Vec<(f64, f64)>,
}

#[pymethods]
impl PyPixelContour {
    #[new]
    fn new(region_number: u32, region_name: String, points: Vec<(f64, f64)>) -> Self {
        Self {
            region_number,
            region_name,
            points,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PixelContour(roi={}, name='{}', points={})",
            self.region_number,
            self.region_name,
            self.points.len()
        )
    }

    fn __len__(&self) -> usize {
        self.points.len()
    }

    /// Columns and rows as two separate lists, handy for plotting.
    fn xy(&self) -> (Vec<f64>, Vec<f64>) {
        self.points.iter().copied().unzip()
    }
}

impl From<&SlicePlot> for PyPixelContour {
    fn from(plot: &SlicePlot) -> Self {
        Self {
            region_number: plot.region_number,
            region_name: plot.region_name.clone(),
            points: plot.points.iter().map(|p| (p.x, p.y)).collect(),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyOverlayResult {
    #[pyo3(get)]
    pub total_slices: usize,
    #[pyo3(get)]
    pub slices_with_contours: usize,
    #[pyo3(get)]
    pub skipped_contours: usize,
    #[pyo3(get)]
    pub failed_files: Vec<String>,
    #[pyo3(get)]
    pub regions: Vec<(u32, String)>,
    #[pyo3(get)]
    pub target_uid: Option<String>,
    #[pyo3(get)]
    pub contours: Vec<PyPixelContour>,
    #[pyo3(get)]
    pub overlay_path: Option<String>,
}

#[pymethods]
impl PyOverlayResult {
    fn __repr__(&self) -> String {
        format!(
            "OverlayResult(slices={}, with_contours={}, target={:?}, contours={})",
            self.total_slices,
            self.slices_with_contours,
            self.target_uid,
            self.contours.len()
        )
    }
}

impl From<OverlayOutcome> for PyOverlayResult {
    fn from(outcome: OverlayOutcome) -> Self {
        let (target_uid, contours, overlay_path) = match &outcome.target {
            Some(t) => (
                Some(t.slice_id.clone()),
                t.contours.iter().map(PyPixelContour::from).collect(),
                Some(t.png_path.display().to_string()),
            ),
            None => (None, Vec::new(), None),
        };

        Self {
            total_slices: outcome.summary.total_slices,
            slices_with_contours: outcome.summary.slices_with_contours,
            skipped_contours: outcome.skipped_contours,
            failed_files: outcome.failed_files.iter().map(|e| e.to_string()).collect(),
            regions: outcome
                .catalog
                .iter()
                .map(|(n, s)| (n, s.to_string()))
                .collect(),
            target_uid,
            contours,
            overlay_path,
        }
    }
}

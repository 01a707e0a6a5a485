//! Human-readable summaries of a loaded study.

use nalgebra::{Point2, Point3};
use std::fmt;

use crate::io::SliceCatalog;
use crate::processing::{AssociationTable, RegionCatalog, SliceGeometry};

#[derive(Debug, Clone, PartialEq)]
pub struct SliceContourCount {
    /// File name of the slice, or its UID when the slice was not found on disk.
    pub label: String,
    pub contours: usize,
}

/// Overview of how the structure set's contours spread over the study.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySummary {
    pub total_slices: usize,
    pub slices_with_contours: usize,
    /// Referenced slices that are not among the loaded images.
    pub unresolved_references: usize,
    pub per_slice: Vec<SliceContourCount>,
}

impl StudySummary {
    pub fn new(slices: &SliceCatalog, table: &AssociationTable) -> Self {
        let mut per_slice = Vec::with_capacity(table.len());
        let mut unresolved = 0;
        for uid in table.slice_ids() {
            let label = match slices.filename(uid) {
                Some(name) => name.to_string(),
                None => {
                    unresolved += 1;
                    uid.to_string()
                }
            };
            per_slice.push(SliceContourCount {
                label,
                contours: table.contours_for(uid).len(),
            });
        }
        per_slice.sort_by(|a, b| a.label.cmp(&b.label));

        StudySummary {
            total_slices: slices.len(),
            slices_with_contours: table.len() - unresolved,
            unresolved_references: unresolved,
            per_slice,
        }
    }
}

impl fmt::Display for StudySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total image slices: {}", self.total_slices)?;
        writeln!(f, "Slices with contours: {}", self.slices_with_contours)?;
        if self.unresolved_references > 0 {
            writeln!(
                f,
                "Referenced slices not found: {}",
                self.unresolved_references
            )?;
        }
        write!(f, "Contours per slice:")?;
        for entry in &self.per_slice {
            write!(f, "\n - {} has {} contours", entry.label, entry.contours)?;
        }
        Ok(())
    }
}

/// One line of a side-by-side listing of two region catalogs.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub left: Option<(u32, String)>,
    pub right: Option<(u32, String)>,
}

/// Lists both catalogs in ascending region number next to each other; the
/// shorter one is padded with empty cells.
pub fn compare_catalogs(left: &RegionCatalog, right: &RegionCatalog) -> Vec<CatalogRow> {
    let mut l = left.iter();
    let mut r = right.iter();
    let mut rows = Vec::with_capacity(left.len().max(right.len()));
    loop {
        let a = l.next().map(|(n, s)| (n, s.to_string()));
        let b = r.next().map(|(n, s)| (n, s.to_string()));
        if a.is_none() && b.is_none() {
            break;
        }
        rows.push(CatalogRow { left: a, right: b });
    }
    rows
}

/// Bounding box of a transformed contour in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRange {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PixelRange {
    pub fn of(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let init = PixelRange {
            x_min: first.x,
            x_max: first.x,
            y_min: first.y,
            y_max: first.y,
        };
        Some(points.iter().fold(init, |r, p| PixelRange {
            x_min: r.x_min.min(p.x),
            x_max: r.x_max.max(p.x),
            y_min: r.y_min.min(p.y),
            y_max: r.y_max.max(p.y),
        }))
    }
}

impl fmt::Display for PixelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {:.1}-{:.1}, Y: {:.1}-{:.1}",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

/// Smallest and largest signed distance (mm) of the points from the slice
/// plane. `None` for an empty contour or a slice without origin.
pub fn plane_offset_range(points: &[Point3<f64>], geometry: &SliceGeometry) -> Option<(f64, f64)> {
    let origin = geometry.origin?;
    let normal = geometry.plane_normal();
    points
        .iter()
        .map(|p| (p - origin).dot(&normal))
        .fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
}

/// Whether every point lies within `tolerance` mm of the slice plane.
pub fn within_plane(points: &[Point3<f64>], geometry: &SliceGeometry, tolerance: f64) -> bool {
    match plane_offset_range(points, geometry) {
        Some((lo, hi)) => lo.abs() <= tolerance && hi.abs() <= tolerance,
        None => true,
    }
}

/// Listing of a catalog, one region per line.
pub fn format_catalog(catalog: &RegionCatalog) -> String {
    let mut out = String::from("Regions of interest:");
    for (number, name) in catalog.iter() {
        out.push_str(&format!("\n - ROI #{} - {}", number, name));
    }
    out
}

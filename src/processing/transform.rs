use nalgebra::{Point2, Point3};
use rayon::prelude::*;

use super::associate::{AssociatedContour, AssociationTable};
use super::slice_geometry::SliceGeometry;
use crate::error::Result;

/// Contour points in (column, row) pixel coordinates of one slice.
pub type TransformedContour = Vec<Point2<f64>>;

/// Maps physical points onto the pixel grid of `geometry`.
///
/// With an orientation the displacement from the origin is projected onto
/// the column and row directions; without one, columns are taken to run
/// along x and rows along y and z is ignored. Results are divided by the
/// pixel spacing and clamped into the raster, so points outside the slice
/// collapse onto its border. No rounding is done. Zero, negative or NaN
/// spacing and an empty raster are rejected as `InvalidGeometry`.
pub fn transform_contour(
    points: &[Point3<f64>],
    geometry: &SliceGeometry,
) -> Result<TransformedContour> {
    let origin = geometry.require_origin()?;
    let spacing = geometry.require_spacing()?;
    geometry.validate()?;

    let max_x = geometry.columns.saturating_sub(1) as f64;
    let max_y = geometry.rows.saturating_sub(1) as f64;

    let transformed = points
        .iter()
        .map(|p| {
            let (x, y) = match geometry.orientation {
                Some(orientation) => {
                    let v = p - origin;
                    (
                        v.dot(&orientation.col) / spacing.col,
                        v.dot(&orientation.row) / spacing.row,
                    )
                }
                None => (
                    (p.x - origin.x) / spacing.col,
                    (p.y - origin.y) / spacing.row,
                ),
            };
            Point2::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y))
        })
        .collect();

    Ok(transformed)
}

/// Transforms every contour against the same slice. Output order follows
/// input order; the first failure is returned.
pub fn transform_contours(
    contours: &[AssociatedContour],
    geometry: &SliceGeometry,
) -> Result<Vec<TransformedContour>> {
    contours
        .par_iter()
        .map(|c| transform_contour(&c.points, geometry))
        .collect()
}

/// Looks up the slice's contours and transforms them. A slice without
/// contours yields an empty list.
pub fn transform_for_slice(
    table: &AssociationTable,
    geometry: &SliceGeometry,
) -> Result<Vec<(u32, TransformedContour)>> {
    let contours = table.contours_for(&geometry.slice_id);
    let transformed = transform_contours(contours, geometry)?;
    Ok(contours
        .iter()
        .map(|c| c.region_number)
        .zip(transformed)
        .collect())
}

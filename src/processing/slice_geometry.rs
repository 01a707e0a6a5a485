use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::error::{OverlayError, Result};
use crate::io::input::SliceRecord;

/// In-plane direction cosines of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    /// Physical direction of increasing column index.
    pub col: Vector3<f64>,
    /// Physical direction of increasing row index.
    pub row: Vector3<f64>,
}

impl Orientation {
    pub fn new(col: Vector3<f64>, row: Vector3<f64>) -> Self {
        Self { col, row }
    }

    /// Builds the pair from the six values stored in a slice file,
    /// column direction first.
    pub fn from_cosines(values: [f64; 6]) -> Self {
        Self {
            col: Vector3::new(values[0], values[1], values[2]),
            row: Vector3::new(values[3], values[4], values[5]),
        }
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.col.cross(&self.row)
    }
}

/// Physical size of one pixel. `col` scales the column coordinate (x) and
/// `row` scales the row coordinate (y); the record stores them in that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelSpacing {
    pub col: f64,
    pub row: f64,
}

impl PixelSpacing {
    pub fn new(col: f64, row: f64) -> Self {
        Self { col, row }
    }
}

/// Physical placement of one slice's pixel grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceGeometry {
    pub slice_id: String,
    /// Physical position of the center of the top-left pixel.
    pub origin: Option<Point3<f64>>,
    /// Without it the slice is assumed axis-aligned (columns along x, rows along y).
    pub orientation: Option<Orientation>,
    pub spacing: Option<PixelSpacing>,
    pub rows: u32,
    pub columns: u32,
}

impl SliceGeometry {
    /// Axis-aligned geometry, mostly useful for synthetic data.
    pub fn axis_aligned(
        slice_id: impl Into<String>,
        origin: Point3<f64>,
        spacing: PixelSpacing,
        rows: u32,
        columns: u32,
    ) -> Self {
        Self {
            slice_id: slice_id.into(),
            origin: Some(origin),
            orientation: None,
            spacing: Some(spacing),
            rows,
            columns,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Checks the invariants that hold whenever the optional fields are set:
    /// strictly positive spacing and a non-empty raster.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(OverlayError::InvalidGeometry {
                slice_id: self.slice_id.clone(),
                reason: format!("raster extent {}x{} is empty", self.rows, self.columns),
            });
        }
        if let Some(spacing) = self.spacing {
            // also rejects NaN
            if !(spacing.col > 0.0 && spacing.row > 0.0) {
                return Err(OverlayError::InvalidGeometry {
                    slice_id: self.slice_id.clone(),
                    reason: format!(
                        "pixel spacing ({}, {}) must be strictly positive",
                        spacing.col, spacing.row
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn require_origin(&self) -> Result<Point3<f64>> {
        self.origin.ok_or_else(|| OverlayError::MissingGeometry {
            slice_id: self.slice_id.clone(),
            field: "origin",
        })
    }

    pub fn require_spacing(&self) -> Result<PixelSpacing> {
        self.spacing.ok_or_else(|| OverlayError::MissingGeometry {
            slice_id: self.slice_id.clone(),
            field: "pixel spacing",
        })
    }

    /// Unit normal of the slice plane; +z when no orientation is recorded.
    pub fn plane_normal(&self) -> Vector3<f64> {
        match self.orientation {
            Some(o) => {
                let n = o.normal();
                let norm = n.norm();
                if norm > f64::EPSILON {
                    n / norm
                } else {
                    Vector3::z()
                }
            }
            None => Vector3::z(),
        }
    }
}

impl From<&SliceRecord> for SliceGeometry {
    fn from(record: &SliceRecord) -> Self {
        Self {
            slice_id: record.sop_instance_uid.clone(),
            origin: record
                .image_position
                .map(|[x, y, z]| Point3::new(x, y, z)),
            orientation: record.image_orientation.map(Orientation::from_cosines),
            spacing: record
                .pixel_spacing
                .map(|[col, row]| PixelSpacing::new(col, row)),
            rows: record.rows,
            columns: record.columns,
        }
    }
}

use nalgebra::Point3;
use serde::Serialize;
use std::collections::HashMap;

use super::structure_set::Contour;

/// One contour as seen from the slice it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociatedContour {
    pub region_number: u32,
    pub points: Vec<Point3<f64>>,
}

/// Contours grouped by the identifier of the slice they were drawn on.
///
/// Slices that no contour references are absent: `get` returns `None` for
/// them and `contours_for` an empty slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssociationTable {
    by_slice: HashMap<String, Vec<AssociatedContour>>,
}

impl AssociationTable {
    /// Adds one entry per (contour, referenced slice) pair, keeping contour
    /// order and reference order. Repeated references give repeated entries.
    pub fn build(contours: &[Contour]) -> Self {
        let mut by_slice: HashMap<String, Vec<AssociatedContour>> = HashMap::new();
        for contour in contours {
            for slice_id in &contour.referenced_slices {
                by_slice
                    .entry(slice_id.clone())
                    .or_default()
                    .push(AssociatedContour {
                        region_number: contour.region_number,
                        points: contour.points.clone(),
                    });
            }
        }
        Self { by_slice }
    }

    pub fn get(&self, slice_id: &str) -> Option<&[AssociatedContour]> {
        self.by_slice.get(slice_id).map(Vec::as_slice)
    }

    pub fn contours_for(&self, slice_id: &str) -> &[AssociatedContour] {
        self.get(slice_id).unwrap_or(&[])
    }

    pub fn contains(&self, slice_id: &str) -> bool {
        self.by_slice.contains_key(slice_id)
    }

    /// Referenced slice identifiers, sorted.
    pub fn slice_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_slice.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of referenced slices.
    pub fn len(&self) -> usize {
        self.by_slice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slice.is_empty()
    }

    /// Total number of entries over all slices.
    pub fn pair_count(&self) -> usize {
        self.by_slice.values().map(Vec::len).sum()
    }
}

use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::OverlayError;
use crate::io::input::{ContourRecord, StructureSetRecord};

/// Region number to region name, as defined by the structure set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionCatalog {
    names: BTreeMap<u32, String>,
}

impl RegionCatalog {
    /// Later definitions of the same number replace earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut names = BTreeMap::new();
        for (number, name) in pairs {
            names.insert(number, name.into());
        }
        Self { names }
    }

    pub fn get(&self, number: u32) -> Option<&str> {
        self.names.get(&number).map(String::as_str)
    }

    /// Catalog name of the region, or `"ROI <number>"` when it has none.
    pub fn resolve(&self, number: u32) -> String {
        match self.get(number) {
            Some(name) => name.to_string(),
            None => format!("ROI {}", number),
        }
    }

    /// Entries in ascending region number.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(n, s)| (*n, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    /// Position of the contour in the structure set's contour list.
    pub index: usize,
    pub region_number: u32,
    pub points: Vec<Point3<f64>>,
    pub referenced_slices: Vec<String>,
    pub geometric_type: Option<String>,
    /// Point count declared by the file, which may disagree with `points`.
    pub number_of_points: Option<u32>,
}

impl Contour {
    /// Groups the flat coordinate list into (x, y, z) points. A declared
    /// point count that disagrees with the data is logged, the data wins.
    pub fn from_record(index: usize, record: &ContourRecord) -> Result<Self, OverlayError> {
        let data = &record.contour_data;
        if data.len() % 3 != 0 {
            return Err(OverlayError::MalformedContourData {
                index,
                region_number: record.referenced_roi_number,
                len: data.len(),
            });
        }

        let points = data
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();

        let contour = Contour {
            index,
            region_number: record.referenced_roi_number,
            points,
            referenced_slices: record.referenced_slice_uids.clone(),
            geometric_type: record.geometric_type.clone(),
            number_of_points: record.number_of_points,
        };
        if !contour.point_count_matches() {
            tracing::warn!(
                "contour {} (ROI {}) declares {} points but carries {}",
                index,
                contour.region_number,
                contour.number_of_points.unwrap_or_default(),
                contour.points.len()
            );
        }
        Ok(contour)
    }

    /// False only when a declared point count differs from the points read.
    pub fn point_count_matches(&self) -> bool {
        match self.number_of_points {
            Some(n) => n as usize == self.points.len(),
            None => true,
        }
    }
}

/// A contour that was left out of the model, with the reason.
#[derive(Debug)]
pub struct SkippedContour {
    pub index: usize,
    pub region_number: u32,
    pub error: OverlayError,
}

#[derive(Debug, Default)]
pub struct StructureSet {
    pub catalog: RegionCatalog,
    pub contours: Vec<Contour>,
    pub skipped: Vec<SkippedContour>,
}

impl StructureSet {
    /// Builds the catalog and the contour list. Malformed contours are set
    /// aside in `skipped` and never abort the build.
    pub fn build(record: &StructureSetRecord) -> Self {
        let catalog = match &record.roi_definitions {
            Some(defs) => RegionCatalog::from_pairs(defs.iter().map(|d| (d.number, d.name.clone()))),
            None => RegionCatalog::default(),
        };

        let mut contours = Vec::new();
        let mut skipped = Vec::new();

        for (index, contour) in record.contours.iter().flatten().enumerate() {
            match Contour::from_record(index, contour) {
                Ok(c) => contours.push(c),
                Err(error) => {
                    tracing::warn!("skipping contour {}: {}", index, error);
                    skipped.push(SkippedContour {
                        index,
                        region_number: contour.referenced_roi_number,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            "structure set: {} regions, {} contours, {} skipped",
            catalog.len(),
            contours.len(),
            skipped.len()
        );

        StructureSet {
            catalog,
            contours,
            skipped,
        }
    }

    /// Number of contours per region number.
    pub fn contour_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.contours {
            *counts.entry(c.region_number).or_insert(0) += 1;
        }
        counts
    }
}

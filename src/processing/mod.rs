pub mod associate;
pub mod slice_geometry;
pub mod structure_set;
pub mod transform;

pub use associate::{AssociatedContour, AssociationTable};
pub use slice_geometry::{Orientation, PixelSpacing, SliceGeometry};
pub use structure_set::{Contour, RegionCatalog, SkippedContour, StructureSet};
pub use transform::{transform_contour, transform_contours, transform_for_slice, TransformedContour};

use csv::Writer;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::Result;
use crate::processing::{AssociatedContour, AssociationTable, RegionCatalog, TransformedContour};
use crate::report::CatalogRow;

/// Writes pixel-space contours of one slice, one row per point.
pub fn write_transformed_contours<P: AsRef<Path>>(
    path: P,
    slice_id: &str,
    catalog: &RegionCatalog,
    contours: &[(u32, TransformedContour)],
) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "slice_id",
        "contour",
        "region_number",
        "region_name",
        "point_index",
        "x",
        "y",
    ])?;

    for (contour_idx, (region_number, points)) in contours.iter().enumerate() {
        let name = catalog.resolve(*region_number);
        for (point_idx, p) in points.iter().enumerate() {
            wtr.write_record([
                slice_id.to_string(),
                contour_idx.to_string(),
                region_number.to_string(),
                name.clone(),
                point_idx.to_string(),
                p.x.to_string(),
                p.y.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Dumps the association table as JSON, slices sorted by identifier.
pub fn write_association_json<P: AsRef<Path>>(path: P, table: &AssociationTable) -> Result<()> {
    let sorted: BTreeMap<&str, &[AssociatedContour]> = table
        .slice_ids()
        .into_iter()
        .map(|id| (id, table.contours_for(id)))
        .collect();

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &sorted)?;
    Ok(())
}

/// Side-by-side region listing of two structure sets.
pub fn write_catalog_comparison<P: AsRef<Path>>(path: P, rows: &[CatalogRow]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record([
        "roi_number_file1",
        "roi_name_file1",
        "roi_number_file2",
        "roi_name_file2",
    ])?;
    for row in rows {
        let (n1, s1) = split_cell(&row.left);
        let (n2, s2) = split_cell(&row.right);
        wtr.write_record([n1, s1, n2, s2])?;
    }
    wtr.flush()?;
    Ok(())
}

fn split_cell(cell: &Option<(u32, String)>) -> (String, String) {
    match cell {
        Some((n, s)) => (n.to_string(), s.clone()),
        None => (String::new(), String::new()),
    }
}

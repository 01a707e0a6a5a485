use anyhow::{anyhow, Context, Result};
use crossbeam::thread;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DecodeError;
use crate::io::config::OverlayConfig;
use crate::io::output::{
    write_association_json, write_catalog_comparison, write_transformed_contours,
};
use crate::io::{load_structure_set, scan_study_folder, SliceCatalog, StudyScan};
use crate::processing::{
    transform_contours, AssociatedContour, AssociationTable, RegionCatalog, SliceGeometry, StructureSet,
    TransformedContour,
};
use crate::render::overlay::{draw_overlay, save_overlay, RenderOptions};
use crate::render::Raster;
use crate::report::{
    compare_catalogs, format_catalog, plane_offset_range, within_plane, CatalogRow, PixelRange,
    StudySummary,
};

/// One contour of the target slice, ready to draw.
#[derive(Debug, Clone)]
pub struct SlicePlot {
    pub region_number: u32,
    pub region_name: String,
    pub points: TransformedContour,
    pub range: Option<PixelRange>,
}

#[derive(Debug, Clone)]
pub struct TargetOverlay {
    pub slice_id: String,
    pub filename: String,
    pub contours: Vec<SlicePlot>,
    pub csv_path: PathBuf,
    pub png_path: PathBuf,
}

#[derive(Debug)]
pub struct OverlayOutcome {
    pub summary: StudySummary,
    pub catalog: RegionCatalog,
    pub skipped_contours: usize,
    pub failed_files: Vec<DecodeError>,
    pub association_path: PathBuf,
    pub target: Option<TargetOverlay>,
}

/// Loads the study named by `config`, summarizes it, and when a target
/// slice is configured writes its contours as CSV and an overlay PNG.
/// `raster` is drawn underneath the contours when given.
pub fn run_overlay(config: &OverlayConfig, raster: Option<&Raster>) -> Result<OverlayOutcome> {
    config.validate()?;

    let scan = scan_study_folder(&config.input_dir)?;
    let StudyScan {
        structure_sets,
        slices,
        failures,
        ..
    } = scan;

    if structure_sets.len() > 1 {
        tracing::warn!(
            "{} structure sets found, using {}",
            structure_sets.len(),
            structure_sets[0].path.display()
        );
    }
    let structure_record = structure_sets.into_iter().next();
    match &structure_record {
        Some(s) => tracing::info!("structure set loaded: {}", s.path.display()),
        None => tracing::warn!(
            "no structure set found in {}",
            config.input_dir.display()
        ),
    }

    // Both models only read their own inputs, build them side by side.
    let ((structure_set, table), slice_catalog) = thread::scope(|s| -> Result<_> {
        let model_handle = s.spawn(|_| {
            let set = structure_record
                .as_ref()
                .map(|r| StructureSet::build(&r.record))
                .unwrap_or_default();
            let table = AssociationTable::build(&set.contours);
            (set, table)
        });
        let slice_handle = s.spawn(|_| SliceCatalog::new(slices));

        let model = model_handle
            .join()
            .map_err(|_| anyhow!("structure set thread panicked"))?;
        let catalog = slice_handle
            .join()
            .map_err(|_| anyhow!("slice catalog thread panicked"))?;
        Ok((model, catalog))
    })
    .map_err(|panic_payload| anyhow!("model threads panicked: {:?}", panic_payload))??;

    if let Some(record) = &structure_record {
        tracing::info!("{}", record.record.header);
    }
    tracing::info!("{}", format_catalog(&structure_set.catalog));
    for (number, count) in structure_set.contour_counts() {
        tracing::debug!("{}: {} contours", structure_set.catalog.resolve(number), count);
    }

    let summary = StudySummary::new(&slice_catalog, &table);
    tracing::info!("{}", summary);

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let association_path = config.output_dir.join("association.json");
    write_association_json(&association_path, &table)
        .with_context(|| format!("writing {}", association_path.display()))?;

    let target = match &config.target_slice {
        Some(name) => Some(overlay_target(
            config,
            name,
            &slice_catalog,
            &structure_set.catalog,
            &table,
            raster,
        )?),
        None => None,
    };

    Ok(OverlayOutcome {
        summary,
        catalog: structure_set.catalog,
        skipped_contours: structure_set.skipped.len(),
        failed_files: failures,
        association_path,
        target,
    })
}

fn overlay_target(
    config: &OverlayConfig,
    name: &str,
    slices: &SliceCatalog,
    catalog: &RegionCatalog,
    table: &AssociationTable,
    raster: Option<&Raster>,
) -> Result<TargetOverlay> {
    let slice = slices
        .find_by_filename(name)
        .ok_or_else(|| anyhow!("slice {} not found in {}", name, config.input_dir.display()))?;
    let geometry = SliceGeometry::from(&slice.record);
    geometry
        .validate()
        .with_context(|| format!("slice {} has unusable geometry", name))?;

    tracing::info!("target slice {} (UID {})", slice.filename, geometry.slice_id);

    let associated: &[AssociatedContour] = match table.get(&geometry.slice_id) {
        Some(contours) => {
            tracing::info!("{} contours for this slice", contours.len());
            contours
        }
        None => {
            tracing::info!("slice {} has no contours in the structure set", name);
            &[]
        }
    };

    if let Some(tolerance) = config.checks.plane_tolerance_mm {
        for (i, c) in associated.iter().enumerate() {
            if within_plane(&c.points, &geometry, tolerance) {
                continue;
            }
            if let Some((lo, hi)) = plane_offset_range(&c.points, &geometry) {
                tracing::warn!(
                    "contour {} ({}) lies {:.2}..{:.2} mm from the slice plane",
                    i,
                    catalog.resolve(c.region_number),
                    lo,
                    hi
                );
            }
        }
    }

    let transformed = transform_contours(associated, &geometry)
        .with_context(|| format!("transforming contours of {}", name))?;

    let plots: Vec<SlicePlot> = associated
        .iter()
        .zip(transformed)
        .map(|(c, points)| {
            let range = PixelRange::of(&points);
            let region_name = catalog.resolve(c.region_number);
            if let Some(r) = &range {
                tracing::info!("{}: {}", region_name, r);
            }
            SlicePlot {
                region_number: c.region_number,
                region_name,
                points,
                range,
            }
        })
        .collect();

    let pairs: Vec<(u32, TransformedContour)> = plots
        .iter()
        .map(|p| (p.region_number, p.points.clone()))
        .collect();

    let csv_path = config.output_dir.join(format!("{}_contours.csv", slice.filename));
    write_transformed_contours(&csv_path, &geometry.slice_id, catalog, &pairs)
        .with_context(|| format!("writing {}", csv_path.display()))?;

    let options = RenderOptions::from(&config.render);
    let drawn: Vec<TransformedContour> = pairs.into_iter().map(|(_, p)| p).collect();
    let img = draw_overlay(raster, &geometry, &drawn, &options)?;
    let png_path = config.output_dir.join(format!("{}_overlay.png", slice.filename));
    save_overlay(&img, &png_path).with_context(|| format!("writing {}", png_path.display()))?;

    if plots.is_empty() {
        tracing::info!("overlay written without contours: {}", png_path.display());
    } else {
        tracing::info!("overlay written: {}", png_path.display());
    }

    Ok(TargetOverlay {
        slice_id: geometry.slice_id,
        filename: slice.filename.clone(),
        contours: plots,
        csv_path,
        png_path,
    })
}

/// Lists the regions of two structure-set files side by side and writes the
/// listing to `out_csv`.
pub fn compare_structure_sets<P, Q, R>(file1: P, file2: Q, out_csv: R) -> Result<Vec<CatalogRow>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let (file1, file2, out_csv) = (file1.as_ref(), file2.as_ref(), out_csv.as_ref());

    let left = StructureSet::build(&load_structure_set(file1)?).catalog;
    let right = StructureSet::build(&load_structure_set(file2)?).catalog;
    tracing::info!("{}: {}", file1.display(), format_catalog(&left));
    tracing::info!("{}: {}", file2.display(), format_catalog(&right));

    let rows = compare_catalogs(&left, &right);
    write_catalog_comparison(out_csv, &rows)
        .with_context(|| format!("writing {}", out_csv.display()))?;
    tracing::info!("region comparison written: {}", out_csv.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::input::RT_STRUCTURE_SET_SOP_CLASS;
    use crate::utils::test_utils::{
        ct_slice, structure_set_object, text, write_dicom, CT_IMAGE_STORAGE,
    };
    use dicom::core::VR;
    use dicom::dictionary_std::tags;
    use nalgebra::Point2;

    const SQUARE: [f64; 12] = [
        2.0, 2.0, 0.0, 10.0, 2.0, 0.0, 10.0, 10.0, 0.0, 2.0, 10.0, 0.0,
    ];
    // 1.5 mm above the slice it references
    const TRIANGLE: [f64; 9] = [20.0, 20.0, 1.5, 25.0, 20.0, 1.5, 25.0, 22.0, 1.5];

    /// Two 24x32 slices and a structure set whose contours all sit on the
    /// first one.
    fn write_study(dir: &Path) {
        write_dicom(
            &dir.join("CT_Image_Storage-107"),
            ct_slice("1.2.3.107", 0.0, 24, 32),
            CT_IMAGE_STORAGE,
            "1.2.3.107",
        );
        write_dicom(
            &dir.join("CT_Image_Storage-108"),
            ct_slice("1.2.3.108", 2.0, 24, 32),
            CT_IMAGE_STORAGE,
            "1.2.3.108",
        );
        let mut rs = structure_set_object(
            &[(11, "Heart"), (12, "Lung")],
            &[(11, &SQUARE[..], "1.2.3.107"), (12, &TRIANGLE[..], "1.2.3.107")],
        );
        rs.put(text(tags::MODALITY, VR::CS, "RTSTRUCT"));
        write_dicom(&dir.join("RS.dcm"), rs, RT_STRUCTURE_SET_SOP_CLASS, "1.2.3.900");
    }

    fn study_config(input: &Path, output: &Path, target: &str) -> OverlayConfig {
        let mut config = OverlayConfig::new(input);
        config.output_dir = output.to_path_buf();
        config.target_slice = Some(target.to_string());
        config.checks.plane_tolerance_mm = Some(0.5);
        config
    }

    #[test]
    fn test_overlay_of_slice_with_contours() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_study(input.path());

        let config = study_config(input.path(), output.path(), "ct_image_storage-107");
        let outcome = run_overlay(&config, None).unwrap();

        assert!(outcome.failed_files.is_empty());
        assert_eq!(outcome.summary.total_slices, 2);
        assert_eq!(outcome.summary.slices_with_contours, 1);
        assert_eq!(outcome.summary.unresolved_references, 0);
        assert_eq!(outcome.catalog.resolve(11), "Heart");
        assert_eq!(outcome.skipped_contours, 0);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&outcome.association_path).unwrap()).unwrap();
        let entries = json["1.2.3.107"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["region_number"], 11);
        assert_eq!(entries[1]["region_number"], 12);
        assert!(json.get("1.2.3.108").is_none());

        let target = outcome.target.unwrap();
        assert_eq!(target.slice_id, "1.2.3.107");
        assert_eq!(target.filename, "CT_Image_Storage-107");
        let names: Vec<&str> = target.contours.iter().map(|c| c.region_name.as_str()).collect();
        assert_eq!(names, vec!["Heart", "Lung"]);
        assert_eq!(
            target.contours[0].points,
            vec![
                Point2::new(2.0, 2.0),
                Point2::new(10.0, 2.0),
                Point2::new(10.0, 10.0),
                Point2::new(2.0, 10.0),
            ]
        );
        // off-plane contour is reported, never dropped
        assert_eq!(target.contours[1].points.len(), 3);

        let mut reader = csv::Reader::from_path(&target.csv_path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(&rows[0][0], "1.2.3.107");
        assert_eq!(&rows[0][3], "Heart");
        assert_eq!((&rows[1][5], &rows[1][6]), ("10", "2"));
        assert_eq!(&rows[6][3], "Lung");

        assert_eq!(image::image_dimensions(&target.png_path).unwrap(), (32, 24));
    }

    #[test]
    fn test_overlay_of_slice_without_contours() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_study(input.path());

        let config = study_config(input.path(), output.path(), "CT_Image_Storage-108");
        let target = run_overlay(&config, None).unwrap().target.unwrap();

        assert_eq!(target.slice_id, "1.2.3.108");
        assert!(target.contours.is_empty());
        let mut reader = csv::Reader::from_path(&target.csv_path).unwrap();
        assert_eq!(reader.records().count(), 0);
        assert_eq!(image::image_dimensions(&target.png_path).unwrap(), (32, 24));
    }

    #[test]
    fn test_overlay_with_raster_underneath() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_study(input.path());

        let config = study_config(input.path(), output.path(), "CT_Image_Storage-107");
        let samples: Vec<f64> = (0..24 * 32).map(|v| v as f64).collect();
        let raster = Raster::new(24, 32, samples).unwrap();
        let target = run_overlay(&config, Some(&raster)).unwrap().target.unwrap();
        assert_eq!(image::image_dimensions(&target.png_path).unwrap(), (32, 24));

        let wrong = Raster::new(32, 32, vec![0.0; 32 * 32]).unwrap();
        assert!(run_overlay(&config, Some(&wrong)).is_err());
    }

    #[test]
    fn test_compare_structure_sets() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.dcm");
        let second = dir.path().join("second.dcm");
        write_dicom(
            &first,
            structure_set_object(&[(11, "Heart"), (12, "Lung"), (14, "Cord")], &[]),
            RT_STRUCTURE_SET_SOP_CLASS,
            "1.2.3.901",
        );
        write_dicom(
            &second,
            structure_set_object(&[(12, "Lungs")], &[]),
            RT_STRUCTURE_SET_SOP_CLASS,
            "1.2.3.902",
        );

        let out = dir.path().join("comparison.csv");
        let rows = compare_structure_sets(&first, &second, &out).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].left, Some((11, "Heart".to_string())));
        assert_eq!(rows[0].right, Some((12, "Lungs".to_string())));
        assert_eq!(rows[2].right, None);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[2][0], "14");
        assert_eq!(&records[2][1], "Cord");
        assert_eq!(&records[2][2], "");

        assert!(compare_structure_sets(&first, dir.path().join("absent.dcm"), &out).is_err());
    }

    #[test]
    fn test_empty_study_without_target() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut config = OverlayConfig::new(input.path());
        config.output_dir = output.path().join("out");

        let outcome = run_overlay(&config, None).unwrap();
        assert_eq!(outcome.summary.total_slices, 0);
        assert!(outcome.catalog.is_empty());
        assert!(outcome.target.is_none());
        assert!(outcome.association_path.exists());
    }

    #[test]
    fn test_unknown_target_is_error() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut config = OverlayConfig::new(input.path());
        config.output_dir = output.path().to_path_buf();
        config.target_slice = Some("CT_Image_Storage-107".into());

        let err = run_overlay(&config, None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_input_is_error() {
        let output = tempfile::tempdir().unwrap();
        let mut config = OverlayConfig::new(output.path().join("nope"));
        config.output_dir = output.path().to_path_buf();
        assert!(run_overlay(&config, None).is_err());
    }
}

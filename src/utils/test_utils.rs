use dicom::core::value::DataSetSequence;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::tags;
use dicom::object::mem::InMemElement;
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use crate::processing::slice_geometry::{PixelSpacing, SliceGeometry};
use crate::processing::structure_set::Contour;

/// Generates reproducible points spread past a 512x512 raster in x and y,
/// so that some of them get clamped.
pub fn random_points(n: usize, seed: u64) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point3::new(
                rng.random_range(-50.0..600.0),
                rng.random_range(-50.0..600.0),
                rng.random_range(-5.0..5.0),
            )
        })
        .collect()
}

/// Origin at zero, unit spacing, 512x512, no orientation.
pub fn axis_aligned_512(slice_id: &str) -> SliceGeometry {
    SliceGeometry::axis_aligned(
        slice_id,
        Point3::origin(),
        PixelSpacing::new(1.0, 1.0),
        512,
        512,
    )
}

/// A small square contour for the given region and slice references.
pub fn contour_with_refs(index: usize, region_number: u32, refs: &[&str]) -> Contour {
    let offset = index as f64;
    Contour {
        index,
        region_number,
        points: vec![
            Point3::new(offset, offset, 0.0),
            Point3::new(offset + 5.0, offset, 0.0),
            Point3::new(offset + 5.0, offset + 5.0, 0.0),
        ],
        referenced_slices: refs.iter().map(|s| s.to_string()).collect(),
        geometric_type: Some("CLOSED_PLANAR".to_string()),
        number_of_points: Some(3),
    }
}

pub fn dicom_item(elements: Vec<InMemElement>) -> InMemDicomObject {
    InMemDicomObject::from_element_iter(elements)
}

pub fn text(tag: Tag, vr: VR, value: &str) -> InMemElement {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

/// Decimal strings are stored as text so they survive a write to disk.
pub fn floats(tag: Tag, vr: VR, values: &[f64]) -> InMemElement {
    let value = match vr {
        VR::DS => PrimitiveValue::Strs(values.iter().map(|v| v.to_string()).collect()),
        _ => PrimitiveValue::F64(values.iter().copied().collect()),
    };
    DataElement::new(tag, vr, value)
}

pub fn seq(tag: Tag, items: Vec<InMemDicomObject>) -> InMemElement {
    DataElement::new(tag, VR::SQ, DataSetSequence::from(items))
}

pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

/// Writes `obj` as a Part 10 file with the given media storage identifiers.
pub fn write_dicom(path: &Path, obj: InMemDicomObject, sop_class: &str, sop_instance: &str) {
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(sop_class)
        .media_storage_sop_instance_uid(sop_instance)
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN);
    obj.with_meta(meta)
        .expect("valid file meta")
        .write_to_file(path)
        .expect("write dicom file");
}

/// Axis-aligned CT slice at height `z` with unit spacing and a blank
/// 16-bit pixel buffer.
pub fn ct_slice(uid: &str, z: f64, rows: u16, columns: u16) -> InMemDicomObject {
    let pixels = vec![0u16; rows as usize * columns as usize];
    dicom_item(vec![
        text(tags::SOP_CLASS_UID, VR::UI, CT_IMAGE_STORAGE),
        text(tags::SOP_INSTANCE_UID, VR::UI, uid),
        text(tags::MODALITY, VR::CS, "CT"),
        floats(tags::IMAGE_POSITION_PATIENT, VR::DS, &[0.0, 0.0, z]),
        floats(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        ),
        floats(tags::PIXEL_SPACING, VR::DS, &[1.0, 1.0]),
        DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1u16)),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns)),
        DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16u16)),
        DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16u16)),
        DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15u16)),
        DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(pixels.into_iter().collect()),
        ),
    ])
}

/// Structure set body with the given region definitions and contours, each
/// contour given as (region number, flat xyz data, referenced slice UID).
/// Carries neither Modality nor SOP Class UID; callers add what they need.
pub fn structure_set_object(
    rois: &[(u32, &str)],
    contours: &[(u32, &[f64], &str)],
) -> InMemDicomObject {
    let definitions = rois
        .iter()
        .map(|(number, name)| {
            dicom_item(vec![
                text(tags::ROI_NUMBER, VR::IS, &number.to_string()),
                text(tags::ROI_NAME, VR::LO, name),
            ])
        })
        .collect();

    let roi_contours = contours
        .iter()
        .map(|(number, data, slice_uid)| {
            let contour = dicom_item(vec![
                text(tags::CONTOUR_GEOMETRIC_TYPE, VR::CS, "CLOSED_PLANAR"),
                text(
                    tags::NUMBER_OF_CONTOUR_POINTS,
                    VR::IS,
                    &(data.len() / 3).to_string(),
                ),
                floats(tags::CONTOUR_DATA, VR::DS, data),
                seq(
                    tags::CONTOUR_IMAGE_SEQUENCE,
                    vec![dicom_item(vec![
                        text(tags::REFERENCED_SOP_CLASS_UID, VR::UI, CT_IMAGE_STORAGE),
                        text(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI, slice_uid),
                    ])],
                ),
            ]);
            dicom_item(vec![
                text(tags::REFERENCED_ROI_NUMBER, VR::IS, &number.to_string()),
                seq(tags::CONTOUR_SEQUENCE, vec![contour]),
            ])
        })
        .collect();

    dicom_item(vec![
        text(tags::STRUCTURE_SET_LABEL, VR::SH, "TEST"),
        seq(tags::STRUCTURE_SET_ROI_SEQUENCE, definitions),
        seq(tags::ROI_CONTOUR_SEQUENCE, roi_contours),
    ])
}

use dicom::dictionary_std::tags;
use dicom::object::InMemDicomObject;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SOP class of RT Structure Set Storage objects.
pub const RT_STRUCTURE_SET_SOP_CLASS: &str = "1.2.840.10008.5.1.4.1.1.481.3";

/// Descriptive attributes of a structure-set file. Every field is optional,
/// files in the wild leave most of them empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSetHeader {
    pub modality: Option<String>,
    pub sop_class_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    pub patient_birth_date: Option<String>,
    pub patient_sex: Option<String>,
    pub study_instance_uid: Option<String>,
    pub study_id: Option<String>,
    pub study_description: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub institution_name: Option<String>,
    pub manufacturer: Option<String>,
    pub operators_name: Option<String>,
    pub structure_set_label: Option<String>,
    #[serde(default)]
    pub frame_of_reference_uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiDefinition {
    pub number: u32,
    pub name: String,
}

/// One entry of the structure set's contour list, flattened out of the
/// per-ROI nesting of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourRecord {
    pub referenced_roi_number: u32,
    /// x, y, z triples back to back.
    pub contour_data: Vec<f64>,
    #[serde(default)]
    pub referenced_slice_uids: Vec<String>,
    #[serde(default)]
    pub geometric_type: Option<String>,
    #[serde(default)]
    pub number_of_points: Option<u32>,
}

/// Decoded structure set. `None` sequences mean the file did not carry
/// them at all, which is treated the same as an empty sequence downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSetRecord {
    #[serde(default)]
    pub header: StructureSetHeader,
    #[serde(default)]
    pub roi_definitions: Option<Vec<RoiDefinition>>,
    #[serde(default)]
    pub contours: Option<Vec<ContourRecord>>,
}

/// Placement attributes of one image slice as stored in its file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceRecord {
    pub sop_instance_uid: String,
    pub image_position: Option<[f64; 3]>,
    pub image_orientation: Option<[f64; 6]>,
    pub pixel_spacing: Option<[f64; 2]>,
    pub rows: u32,
    pub columns: u32,
}

impl StructureSetRecord {
    pub fn from_dicom(obj: &InMemDicomObject) -> Self {
        let roi_definitions = obj
            .element(tags::STRUCTURE_SET_ROI_SEQUENCE)
            .ok()
            .and_then(|e| e.items())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|roi| {
                        let number = get_u32(roi, tags::ROI_NUMBER)?;
                        let name = get_string(roi, tags::ROI_NAME).unwrap_or_default();
                        Some(RoiDefinition { number, name })
                    })
                    .collect()
            });

        let contours = obj
            .element(tags::ROI_CONTOUR_SEQUENCE)
            .ok()
            .and_then(|e| e.items())
            .map(|roi_contours| {
                let mut records = Vec::new();
                for roi_contour in roi_contours {
                    let Some(roi_number) = get_u32(roi_contour, tags::REFERENCED_ROI_NUMBER)
                    else {
                        tracing::warn!("ROI contour item without a referenced ROI number, skipping");
                        continue;
                    };
                    let Some(items) = roi_contour
                        .element(tags::CONTOUR_SEQUENCE)
                        .ok()
                        .and_then(|e| e.items())
                    else {
                        continue;
                    };
                    for contour in items {
                        records.push(contour_record(roi_number, contour));
                    }
                }
                records
            });

        StructureSetRecord {
            header: StructureSetHeader::from_dicom(obj),
            roi_definitions,
            contours,
        }
    }
}

fn contour_record(roi_number: u32, contour: &InMemDicomObject) -> ContourRecord {
    let referenced_slice_uids = contour
        .element(tags::CONTOUR_IMAGE_SEQUENCE)
        .ok()
        .and_then(|e| e.items())
        .map(|refs| {
            refs.iter()
                .filter_map(|r| get_string(r, tags::REFERENCED_SOP_INSTANCE_UID))
                .collect()
        })
        .unwrap_or_default();

    ContourRecord {
        referenced_roi_number: roi_number,
        contour_data: get_f64_vec(contour, tags::CONTOUR_DATA).unwrap_or_default(),
        referenced_slice_uids,
        geometric_type: get_string(contour, tags::CONTOUR_GEOMETRIC_TYPE),
        number_of_points: get_u32(contour, tags::NUMBER_OF_CONTOUR_POINTS),
    }
}

impl StructureSetHeader {
    pub fn from_dicom(obj: &InMemDicomObject) -> Self {
        let frame_of_reference_uids = obj
            .element(tags::REFERENCED_FRAME_OF_REFERENCE_SEQUENCE)
            .ok()
            .and_then(|e| e.items())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| get_string(i, tags::FRAME_OF_REFERENCE_UID))
                    .collect()
            })
            .unwrap_or_default();

        StructureSetHeader {
            modality: get_string(obj, tags::MODALITY),
            sop_class_uid: get_string(obj, tags::SOP_CLASS_UID),
            sop_instance_uid: get_string(obj, tags::SOP_INSTANCE_UID),
            patient_name: get_string(obj, tags::PATIENT_NAME),
            patient_id: get_string(obj, tags::PATIENT_ID),
            patient_birth_date: get_string(obj, tags::PATIENT_BIRTH_DATE),
            patient_sex: get_string(obj, tags::PATIENT_SEX),
            study_instance_uid: get_string(obj, tags::STUDY_INSTANCE_UID),
            study_id: get_string(obj, tags::STUDY_ID),
            study_description: get_string(obj, tags::STUDY_DESCRIPTION),
            study_date: get_string(obj, tags::STUDY_DATE),
            study_time: get_string(obj, tags::STUDY_TIME),
            institution_name: get_string(obj, tags::INSTITUTION_NAME),
            manufacturer: get_string(obj, tags::MANUFACTURER),
            operators_name: get_string(obj, tags::OPERATORS_NAME),
            structure_set_label: get_string(obj, tags::STRUCTURE_SET_LABEL),
            frame_of_reference_uids,
        }
    }
}

impl fmt::Display for StructureSetHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_na(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("N/A")
        }

        writeln!(f, "Structure set:")?;
        writeln!(f, " - Modality               : {}", or_na(&self.modality))?;
        writeln!(f, " - SOP Class UID          : {}", or_na(&self.sop_class_uid))?;
        writeln!(f, " - SOP Instance UID       : {}", or_na(&self.sop_instance_uid))?;
        writeln!(f, " - Label                  : {}", or_na(&self.structure_set_label))?;
        writeln!(f, "Patient:")?;
        writeln!(f, " - Patient Name           : {}", or_na(&self.patient_name))?;
        writeln!(f, " - Patient ID             : {}", or_na(&self.patient_id))?;
        writeln!(f, " - Patient Birth Date     : {}", or_na(&self.patient_birth_date))?;
        writeln!(f, " - Patient Sex            : {}", or_na(&self.patient_sex))?;
        writeln!(f, "Study:")?;
        writeln!(f, " - Study Instance UID     : {}", or_na(&self.study_instance_uid))?;
        writeln!(f, " - Study ID               : {}", or_na(&self.study_id))?;
        writeln!(f, " - Study Description      : {}", or_na(&self.study_description))?;
        writeln!(f, " - Study Date             : {}", or_na(&self.study_date))?;
        writeln!(f, " - Study Time             : {}", or_na(&self.study_time))?;
        writeln!(f, "Institution:")?;
        writeln!(f, " - Institution Name       : {}", or_na(&self.institution_name))?;
        writeln!(f, " - Manufacturer           : {}", or_na(&self.manufacturer))?;
        writeln!(f, " - Operators' Name        : {}", or_na(&self.operators_name))?;
        if self.frame_of_reference_uids.is_empty() {
            write!(f, " - Frame of Reference UID : N/A")
        } else {
            write!(
                f,
                " - Frame of Reference UID : {}",
                self.frame_of_reference_uids.join(", ")
            )
        }
    }
}

impl SliceRecord {
    /// Returns `None` when the object has no SOP Instance UID, since such a
    /// slice can never be referenced by a contour.
    pub fn from_dicom(obj: &InMemDicomObject) -> Option<Self> {
        let sop_instance_uid = get_string(obj, tags::SOP_INSTANCE_UID)?;

        let image_position = get_f64_vec(obj, tags::IMAGE_POSITION_PATIENT)
            .and_then(|v| <[f64; 3]>::try_from(v.as_slice()).ok());
        let image_orientation = get_f64_vec(obj, tags::IMAGE_ORIENTATION_PATIENT)
            .and_then(|v| <[f64; 6]>::try_from(v.as_slice()).ok());
        let pixel_spacing = get_f64_vec(obj, tags::PIXEL_SPACING)
            .and_then(|v| <[f64; 2]>::try_from(v.as_slice()).ok());

        Some(SliceRecord {
            sop_instance_uid,
            image_position,
            image_orientation,
            pixel_spacing,
            rows: get_u32(obj, tags::ROWS).unwrap_or(0),
            columns: get_u32(obj, tags::COLUMNS).unwrap_or(0),
        })
    }
}

// --- Helpers ---

pub(crate) fn get_string(obj: &InMemDicomObject, tag: dicom::core::Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let trimmed = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn get_u32(obj: &InMemDicomObject, tag: dicom::core::Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_f64_vec(obj: &InMemDicomObject, tag: dicom::core::Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}

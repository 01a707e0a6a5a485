pub mod config;
pub mod input;
pub mod output;

use anyhow::Context;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, InMemDicomObject};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DecodeError;
use crate::processing::SliceGeometry;
use input::{get_string, SliceRecord, StructureSetRecord, RT_STRUCTURE_SET_SOP_CLASS};

/// File name prefix some planning systems give their structure-set exports.
const STRUCTURE_SET_FILE_PREFIX: &str = "RT_Structure_Set_Storage-";

#[derive(Debug, Clone)]
pub struct LoadedStructureSet {
    pub path: PathBuf,
    pub record: StructureSetRecord,
}

#[derive(Debug, Clone)]
pub struct LoadedSlice {
    pub path: PathBuf,
    pub filename: String,
    pub record: SliceRecord,
}

/// Outcome of reading every file of a study folder. Files that fail to
/// decode are listed in `failures` and do not affect the others.
#[derive(Debug, Default)]
pub struct StudyScan {
    pub structure_sets: Vec<LoadedStructureSet>,
    pub slices: Vec<LoadedSlice>,
    pub ignored: Vec<PathBuf>,
    pub failures: Vec<DecodeError>,
}

enum FileOutcome {
    StructureSet(LoadedStructureSet),
    Slice(LoadedSlice),
    Ignored(PathBuf),
    Failed(DecodeError),
}

/// Reads all regular files of `folder` (not recursive) as DICOM and sorts
/// them into structure sets and image slices.
pub fn scan_study_folder<P: AsRef<Path>>(folder: P) -> anyhow::Result<StudyScan> {
    let folder = folder.as_ref();

    let mut entries: Vec<PathBuf> = fs::read_dir(folder)
        .with_context(|| format!("failed to read study folder {}", folder.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let outcomes: Vec<FileOutcome> = entries.par_iter().map(|p| classify_file(p)).collect();

    let mut scan = StudyScan::default();
    for outcome in outcomes {
        match outcome {
            FileOutcome::StructureSet(s) => scan.structure_sets.push(s),
            FileOutcome::Slice(s) => scan.slices.push(s),
            FileOutcome::Ignored(p) => scan.ignored.push(p),
            FileOutcome::Failed(e) => {
                tracing::warn!("{}", e);
                scan.failures.push(e);
            }
        }
    }

    tracing::info!(
        "scanned {}: {} structure set(s), {} slice(s), {} ignored, {} failed",
        folder.display(),
        scan.structure_sets.len(),
        scan.slices.len(),
        scan.ignored.len(),
        scan.failures.len()
    );

    Ok(scan)
}

/// Reads a single structure-set file. A file that does not look like a
/// structure set is still read, with a warning.
pub fn load_structure_set<P: AsRef<Path>>(path: P) -> anyhow::Result<StructureSetRecord> {
    let path = path.as_ref();
    let obj = open_file(path).map_err(|e| DecodeError::new(path, e))?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_structure_set(&obj, &filename) {
        tracing::warn!("{} does not look like a structure set", path.display());
    }
    Ok(StructureSetRecord::from_dicom(&obj))
}

fn classify_file(path: &Path) -> FileOutcome {
    let obj = match open_file(path) {
        Ok(obj) => obj,
        Err(e) => return FileOutcome::Failed(DecodeError::new(path, e)),
    };
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    if is_structure_set(&obj, &filename) {
        return FileOutcome::StructureSet(LoadedStructureSet {
            path: path.to_path_buf(),
            record: StructureSetRecord::from_dicom(&obj),
        });
    }

    if obj.element(tags::PIXEL_DATA).is_ok() {
        return match SliceRecord::from_dicom(&obj) {
            Some(record) => FileOutcome::Slice(LoadedSlice {
                path: path.to_path_buf(),
                filename,
                record,
            }),
            None => FileOutcome::Failed(DecodeError::new(path, "image without SOP Instance UID")),
        };
    }

    FileOutcome::Ignored(path.to_path_buf())
}

fn is_structure_set(obj: &InMemDicomObject, filename: &str) -> bool {
    get_string(obj, tags::MODALITY).as_deref() == Some("RTSTRUCT")
        || get_string(obj, tags::SOP_CLASS_UID).as_deref() == Some(RT_STRUCTURE_SET_SOP_CLASS)
        || filename.starts_with(STRUCTURE_SET_FILE_PREFIX)
}

/// Slices of a study keyed by SOP Instance UID.
#[derive(Debug, Clone, Default)]
pub struct SliceCatalog {
    slices: HashMap<String, LoadedSlice>,
}

impl SliceCatalog {
    /// A repeated UID keeps the first file seen.
    pub fn new(slices: Vec<LoadedSlice>) -> Self {
        let mut map = HashMap::with_capacity(slices.len());
        for slice in slices {
            let uid = slice.record.sop_instance_uid.clone();
            if map.contains_key(&uid) {
                tracing::warn!(
                    "duplicate slice {} in {}, keeping the first",
                    uid,
                    slice.path.display()
                );
                continue;
            }
            map.insert(uid, slice);
        }
        Self { slices: map }
    }

    pub fn get(&self, uid: &str) -> Option<&LoadedSlice> {
        self.slices.get(uid)
    }

    /// Case-insensitive match on the file name. An exact match is preferred;
    /// among names differing only by case the lowest path wins.
    pub fn find_by_filename(&self, name: &str) -> Option<&LoadedSlice> {
        if let Some(exact) = self
            .slices
            .values()
            .filter(|s| s.filename == name)
            .min_by(|a, b| a.path.cmp(&b.path))
        {
            return Some(exact);
        }
        let wanted = name.to_lowercase();
        self.slices
            .values()
            .filter(|s| s.filename.to_lowercase() == wanted)
            .min_by(|a, b| a.path.cmp(&b.path))
    }

    pub fn geometry(&self, uid: &str) -> Option<SliceGeometry> {
        self.get(uid).map(|s| SliceGeometry::from(&s.record))
    }

    pub fn filename(&self, uid: &str) -> Option<&str> {
        self.get(uid).map(|s| s.filename.as_str())
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedSlice> {
        self.slices.values()
    }
}

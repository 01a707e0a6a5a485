use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading structure sets, building the contour model
/// and mapping contours onto slices.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// A file could not be parsed as DICOM at all.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Flat contour data whose length is not a multiple of three.
    #[error("contour {index} (ROI {region_number}) has {len} values, not a multiple of 3")]
    MalformedContourData {
        index: usize,
        region_number: u32,
        len: usize,
    },

    /// The target slice lacks a field the transform cannot do without.
    #[error("slice {slice_id} is missing {field}")]
    MissingGeometry {
        slice_id: String,
        field: &'static str,
    },

    #[error("slice {slice_id} has invalid geometry: {reason}")]
    InvalidGeometry { slice_id: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// A single file that failed to decode during a folder scan.
#[derive(Debug, Clone, Error)]
#[error("failed to decode {}: {message}", .path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    pub message: String,
}

impl DecodeError {
    pub fn new(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;

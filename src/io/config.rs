use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OverlayError, Result};

/// Settings for one overlay run, usually read from a TOML file:
///
/// ```toml
/// input_dir = "data/patient_1"
/// target_slice = "CT_Image_Storage-107"
/// output_dir = "output/patient_1"
///
/// [render]
/// draw_points = true
/// window_percentiles = [2.0, 98.0]
///
/// [checks]
/// plane_tolerance_mm = 1.5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverlayConfig {
    pub input_dir: PathBuf,
    /// File name of the slice to overlay; without it only the study is summarized.
    #[serde(default)]
    pub target_slice: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub checks: CheckConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_draw_points")]
    pub draw_points: bool,
    #[serde(default = "default_window")]
    pub window_percentiles: [f64; 2],
    #[serde(default = "default_point_radius")]
    pub point_radius: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CheckConfig {
    /// Largest accepted distance (mm) between contour points and the plane
    /// of the slice they are drawn on. Unset disables the check.
    #[serde(default)]
    pub plane_tolerance_mm: Option<f64>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_draw_points() -> bool {
    true
}

fn default_window() -> [f64; 2] {
    [2.0, 98.0]
}

fn default_point_radius() -> u32 {
    2
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_points: default_draw_points(),
            window_percentiles: default_window(),
            point_radius: default_point_radius(),
        }
    }
}

impl OverlayConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            target_slice: None,
            output_dir: default_output_dir(),
            render: RenderConfig::default(),
            checks: CheckConfig::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: OverlayConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let [lo, hi] = self.render.window_percentiles;
        if !(0.0..=100.0).contains(&lo) || !(0.0..=100.0).contains(&hi) || lo >= hi {
            return Err(OverlayError::Config(format!(
                "window percentiles [{}, {}] must be ascending within [0, 100]",
                lo, hi
            )));
        }
        if let Some(tol) = self.checks.plane_tolerance_mm {
            if !(tol >= 0.0) {
                return Err(OverlayError::Config(format!(
                    "plane tolerance {} must be non-negative",
                    tol
                )));
            }
        }
        if let Some(target) = &self.target_slice {
            if target.trim().is_empty() {
                return Err(OverlayError::Config("target slice name is empty".into()));
            }
        }
        Ok(())
    }
}

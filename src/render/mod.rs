pub mod overlay;

use image::{GrayImage, Luma};

use crate::error::{OverlayError, Result};

/// Pixel samples of one slice in row-major order. The overlay code does not
/// care where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub rows: u32,
    pub columns: u32,
    pub samples: Vec<f64>,
}

impl Raster {
    pub fn new(rows: u32, columns: u32, samples: Vec<f64>) -> Result<Self> {
        let expected = rows as usize * columns as usize;
        if samples.len() != expected {
            return Err(OverlayError::InvalidGeometry {
                slice_id: "raster".to_string(),
                reason: format!(
                    "{} samples for a {}x{} raster (expected {})",
                    samples.len(),
                    rows,
                    columns,
                    expected
                ),
            });
        }
        Ok(Self {
            rows,
            columns,
            samples,
        })
    }

    /// Value below which `pct` percent of the samples fall, linearly
    /// interpolated between neighbouring ranks.
    pub fn percentile(&self, pct: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }

    /// Clips the samples to the `[lo_pct, hi_pct]` percentile window and
    /// stretches it over 0..=255. A flat raster maps to black.
    pub fn window(&self, lo_pct: f64, hi_pct: f64) -> GrayImage {
        let (Some(lo), Some(hi)) = (self.percentile(lo_pct), self.percentile(hi_pct)) else {
            return GrayImage::new(self.columns, self.rows);
        };
        let span = hi - lo;

        GrayImage::from_fn(self.columns, self.rows, |x, y| {
            let v = self.samples[y as usize * self.columns as usize + x as usize];
            let normalized = if span > 0.0 {
                ((v.clamp(lo, hi) - lo) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Luma([(normalized * 255.0).round() as u8])
        })
    }
}

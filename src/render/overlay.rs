use image::{Rgb, RgbImage};
use nalgebra::Point2;
use std::path::Path;

use super::Raster;
use crate::error::{OverlayError, Result};
use crate::io::config::RenderConfig;
use crate::processing::{SliceGeometry, TransformedContour};

/// Ten-color cycle used for successive contours.
pub const PALETTE: [[u8; 3]; 10] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub window_percentiles: [f64; 2],
    pub draw_points: bool,
    pub point_radius: u32,
    /// Join the last point back to the first.
    pub close_contours: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            window_percentiles: config.window_percentiles,
            draw_points: config.draw_points,
            point_radius: config.point_radius,
            close_contours: true,
        }
    }
}

pub fn contour_color(index: usize) -> Rgb<u8> {
    Rgb(PALETTE[index % PALETTE.len()])
}

/// Draws pixel-space contours over the slice. Without a raster the
/// contours are drawn on a black canvas of the slice's extent.
pub fn draw_overlay(
    raster: Option<&Raster>,
    geometry: &SliceGeometry,
    contours: &[TransformedContour],
    options: &RenderOptions,
) -> Result<RgbImage> {
    geometry.validate()?;

    let mut img = match raster {
        Some(r) => {
            if r.rows != geometry.rows || r.columns != geometry.columns {
                return Err(OverlayError::InvalidGeometry {
                    slice_id: geometry.slice_id.clone(),
                    reason: format!(
                        "raster is {}x{} but the slice is {}x{}",
                        r.rows, r.columns, geometry.rows, geometry.columns
                    ),
                });
            }
            let [lo, hi] = options.window_percentiles;
            let gray = r.window(lo, hi);
            RgbImage::from_fn(geometry.columns, geometry.rows, |x, y| {
                let v = gray.get_pixel(x, y)[0];
                Rgb([v, v, v])
            })
        }
        None => RgbImage::new(geometry.columns, geometry.rows),
    };

    for (i, contour) in contours.iter().enumerate() {
        let color = contour_color(i);
        for pair in contour.windows(2) {
            draw_line(&mut img, pair[0], pair[1], color);
        }
        if options.close_contours && contour.len() > 2 {
            if let (Some(first), Some(last)) = (contour.first(), contour.last()) {
                draw_line(&mut img, *last, *first, color);
            }
        }
        if options.draw_points {
            for p in contour {
                draw_marker(&mut img, *p, options.point_radius, color);
            }
        }
    }

    Ok(img)
}

pub fn save_overlay<P: AsRef<Path>>(img: &RgbImage, path: P) -> Result<()> {
    img.save(path)?;
    Ok(())
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = a.x + (b.x - a.x) * t;
        let y = a.y + (b.y - a.y) * t;
        put(img, x.round() as i64, y.round() as i64, color);
    }
}

fn draw_marker(img: &mut RgbImage, center: Point2<f64>, radius: u32, color: Rgb<u8>) {
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    let r = radius as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::axis_aligned_512;

    fn square() -> TransformedContour {
        vec![
            Point2::new(10.0, 10.0),
            Point2::new(20.0, 10.0),
            Point2::new(20.0, 20.0),
            Point2::new(10.0, 20.0),
        ]
    }

    #[test]
    fn test_blank_canvas_matches_slice_extent() {
        let mut geom = axis_aligned_512("IMG1");
        geom.rows = 64;
        geom.columns = 32;
        let img = draw_overlay(None, &geom, &[], &RenderOptions::default()).unwrap();
        assert_eq!(img.dimensions(), (32, 64));
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_contour_edges_are_drawn_including_closing_edge() {
        let geom = axis_aligned_512("IMG1");
        let options = RenderOptions {
            draw_points: false,
            ..RenderOptions::default()
        };
        let img = draw_overlay(None, &geom, &[square()], &options).unwrap();
        let color = contour_color(0);
        assert_eq!(*img.get_pixel(15, 10), color);
        assert_eq!(*img.get_pixel(20, 15), color);
        // closing edge from (10,20) back to (10,10)
        assert_eq!(*img.get_pixel(10, 15), color);
        assert_eq!(*img.get_pixel(15, 15), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_colors_cycle() {
        assert_eq!(contour_color(0), contour_color(10));
        assert_ne!(contour_color(0), contour_color(1));
    }

    #[test]
    fn test_raster_size_must_match() {
        let geom = axis_aligned_512("IMG1");
        let raster = Raster::new(2, 2, vec![0.0; 4]).unwrap();
        assert!(draw_overlay(Some(&raster), &geom, &[], &RenderOptions::default()).is_err());
    }

    #[test]
    fn test_save_png() {
        let temp = tempfile::tempdir().unwrap();
        let mut geom = axis_aligned_512("IMG1");
        geom.rows = 30;
        geom.columns = 30;
        let raster = Raster::new(30, 30, (0..900).map(|v| v as f64).collect()).unwrap();
        let img = draw_overlay(Some(&raster), &geom, &[square()], &RenderOptions::default()).unwrap();
        let path = temp.path().join("overlay.png");
        save_overlay(&img, &path).unwrap();
        assert!(path.exists());
    }
}

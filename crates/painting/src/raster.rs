//! Path rasterization for bristle strokes
//!
//! A whole bristle path is stroked in one tiny-skia pass with round caps and
//! round joins. Coverage inside one path is therefore the union of its
//! polylines, so overlapping bristles of the same stroke do not double up.
//! The coverage is read back and painted into an f32 surface.

use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::debug;

use crate::geometry::Path;
use crate::surface::{CpuSurface, PixelRect, SurfaceError};
use crate::types::premultiply;

/// How a path is painted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// Straight-alpha RGBA
    pub color: [f32; 4],
    pub line_width: f32,
}

/// One subpath per polyline; polylines with non-finite vertices are skipped
fn to_skia_path(path: &Path) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for polyline in path.polylines() {
        let vertices = polyline.vertices();
        if vertices.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let Some((first, rest)) = vertices.split_first() else {
            continue;
        };
        builder.move_to(first.x, first.y);
        if rest.is_empty() {
            // Zero-length segment, drawn as a round dot
            builder.line_to(first.x, first.y);
        }
        for vertex in rest {
            builder.line_to(vertex.x, vertex.y);
        }
    }
    builder.finish()
}

/// Stroke `path` into an opaque coverage pixmap
fn stroke_coverage(
    path: &tiny_skia::Path,
    line_width: f32,
    width: u32,
    height: u32,
) -> Result<Pixmap, SurfaceError> {
    let mut pixmap =
        Pixmap::new(width, height).ok_or(SurfaceError::Allocation { width, height })?;

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = true;

    let mut stroke = Stroke::default();
    stroke.width = line_width;
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
    Ok(pixmap)
}

/// Rasterize `path` into a fresh transparent surface of the given size
///
/// Returns the surface and the painted region, or None when the path covers
/// no pixel (empty path, zero width, entirely off-canvas).
pub fn rasterize_path(
    path: &Path,
    style: &StrokeStyle,
    width: u32,
    height: u32,
) -> Result<Option<(CpuSurface, PixelRect)>, SurfaceError> {
    if path.is_empty() || !(style.line_width > 0.0) {
        debug!("rasterize_path: empty path or non-positive line width");
        return Ok(None);
    }
    let Some(skia_path) = to_skia_path(path) else {
        debug!("rasterize_path: no drawable polylines");
        return Ok(None);
    };

    let coverage = stroke_coverage(&skia_path, style.line_width, width, height)?;
    let mut surface = CpuSurface::try_new(width, height)?;
    let color = premultiply(style.color);

    let (mut x_min, mut y_min) = (u32::MAX, u32::MAX);
    let (mut x_max, mut y_max) = (0, 0);
    for (index, pixel) in coverage.pixels().iter().enumerate() {
        let alpha = pixel.alpha();
        if alpha == 0 {
            continue;
        }
        let x = (index % width as usize) as u32;
        let y = (index / width as usize) as u32;
        let weight = alpha as f32 / 255.0;
        surface.set_pixel(x, y, color.map(|c| c * weight));

        x_min = x_min.min(x);
        y_min = y_min.min(y);
        x_max = x_max.max(x + 1);
        y_max = y_max.max(y + 1);
    }

    if x_min >= x_max || y_min >= y_max {
        debug!("rasterize_path: path covers no pixels");
        return Ok(None);
    }
    let rect = PixelRect::new(x_min, y_min, x_max - x_min, y_max - y_min);
    Ok(Some((surface, rect)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polyline;
    use glam::Vec2;

    fn line(points: &[(f32, f32)]) -> Path {
        Path::new(vec![Polyline::new(
            points.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
        )])
    }

    const WHITE: StrokeStyle = StrokeStyle {
        color: [1.0, 1.0, 1.0, 1.0],
        line_width: 3.0,
    };

    #[test]
    fn test_horizontal_line_coverage() {
        let (surface, rect) = rasterize_path(&line(&[(10.0, 20.0), (50.0, 20.0)]), &WHITE, 64, 64)
            .unwrap()
            .unwrap();

        // Row 19 lies wholly inside the 18.5..21.5 band
        assert_eq!(surface.get_pixel(30, 19), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(surface.get_pixel(30, 25), Some([0.0; 4]));
        assert!(rect.x <= 10 && rect.x + rect.width >= 50);
        assert!(rect.y <= 18 && rect.y + rect.height >= 22);
    }

    #[test]
    fn test_round_cap_extends_past_endpoint() {
        let (surface, _) = rasterize_path(&line(&[(10.0, 20.0), (30.0, 20.0)]), &WHITE, 64, 64)
            .unwrap()
            .unwrap();
        // One pixel beyond the end along the axis is still inside the cap
        assert!(surface.get_pixel(30, 19).unwrap()[3] > 0.9);
        // Diagonal corner outside the cap radius
        assert_eq!(surface.get_pixel(33, 23).unwrap()[3], 0.0);
    }

    #[test]
    fn test_overlapping_polylines_do_not_accumulate() {
        let half = StrokeStyle {
            color: [1.0, 0.0, 0.0, 0.5],
            line_width: 3.0,
        };
        let path = Path::new(vec![
            Polyline::new(vec![Vec2::new(0.0, 10.0), Vec2::new(40.0, 10.0)]),
            Polyline::new(vec![Vec2::new(20.0, 0.0), Vec2::new(20.0, 40.0)]),
        ]);
        let (surface, _) = rasterize_path(&path, &half, 48, 48).unwrap().unwrap();
        // The crossing pixel has the same alpha as a single stroke
        let crossing = surface.get_pixel(20, 10).unwrap();
        assert!((crossing[3] - 0.5).abs() < 1e-6);
        assert!((crossing[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_straight_alpha_color_is_premultiplied() {
        let style = StrokeStyle {
            color: [0.0, 1.0, 0.0, 0.25],
            line_width: 5.0,
        };
        let (surface, _) = rasterize_path(&line(&[(2.0, 8.0), (14.0, 8.0)]), &style, 16, 16)
            .unwrap()
            .unwrap();
        assert_eq!(surface.get_pixel(8, 8), Some([0.0, 0.25, 0.0, 0.25]));
    }

    #[test]
    fn test_degenerate_paths_rasterize_to_nothing() {
        assert!(rasterize_path(&Path::default(), &WHITE, 16, 16).unwrap().is_none());

        let off_canvas = line(&[(-100.0, -100.0), (-50.0, -80.0)]);
        assert!(rasterize_path(&off_canvas, &WHITE, 16, 16).unwrap().is_none());

        let zero_width = StrokeStyle {
            line_width: 0.0,
            ..WHITE
        };
        assert!(
            rasterize_path(&line(&[(1.0, 1.0), (9.0, 9.0)]), &zero_width, 16, 16)
                .unwrap()
                .is_none()
        );

        let nan = line(&[(f32::NAN, 1.0), (9.0, 9.0)]);
        assert!(rasterize_path(&nan, &WHITE, 16, 16).unwrap().is_none());
    }

    #[test]
    fn test_partially_off_canvas_is_clipped() {
        let (surface, rect) = rasterize_path(&line(&[(-20.0, 4.0), (6.0, 4.0)]), &WHITE, 8, 8)
            .unwrap()
            .unwrap();
        assert_eq!(rect.x, 0);
        assert!(rect.x + rect.width <= 8);
        assert!(surface.get_pixel(0, 3).unwrap()[3] > 0.9);
    }
}

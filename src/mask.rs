//! Alpha masks for one kaleidoscope geometry: the angular wedge and the clipping disk.
//!
//! Angles are measured from the "up" axis of the canvas and grow clockwise on screen
//! (Y grows downward): a point at angle `a` and distance `r` from the centre sits at
//! `(cx + r*sin a, cy - r*cos a)`.
//!
//! Both outlines are `kurbo` paths filled by `vello_cpu`, so edges carry anti-aliased
//! coverage instead of a hard 0/255 step.

use vello_cpu::kurbo::{BezPath, Circle, Point, Shape};

use crate::error::{Error, Result};
use crate::transform::fill_coverage;
use crate::types::Mask;

/// How far each straight wedge edge is pushed outward, in pixels. Neighbouring
/// sectors overlap by twice this, which keeps seams and the apex fully opaque after
/// the sectors are resampled into place.
pub const SEAM_OVERLAP: f64 = 4.0;

/// The pushed-out edges meet behind the centre; the tip is cut this far below it.
const APEX_CAP: f64 = 2.0 * SEAM_OVERLAP;

/// Flattening tolerance for the disk outline, in pixels.
const CIRCLE_TOLERANCE: f64 = 0.05;

/// Outline of the wedge spanning `[-angle/2, +angle/2]` around "up", apex at the
/// canvas centre. The arc is a polyline with `max(10, round(angle))` segments and
/// the outline is symmetric about the vertical centre line.
pub fn wedge_path(canvas: (u32, u32), angle_deg: f32) -> Result<BezPath> {
    if !(angle_deg > 0.0 && angle_deg <= 180.0) {
        return Err(Error::invalid_geometry(format!(
            "wedge angle must be in (0, 180], got {angle_deg}"
        )));
    }
    let (cx, cy) = (f64::from(canvas.0) / 2.0, f64::from(canvas.1) / 2.0);
    let d = SEAM_OVERLAP;
    let r = f64::from(canvas.0.min(canvas.1)) / 2.0 + d;
    let half = f64::from(angle_deg / 2.0).to_radians();
    let (sin_h, cos_h) = half.sin_cos();

    let mut path = BezPath::new();
    // left edge runs along (-sin h, -cos h); its outward normal is (-cos h, sin h)
    if d / sin_h <= APEX_CAP {
        path.move_to((cx, cy + d / sin_h));
    } else {
        // where the pushed-out left edge crosses the cap line
        let t = (d * sin_h - APEX_CAP) / cos_h;
        let x = cx - d * cos_h - t * sin_h;
        path.move_to((2.0 * cx - x, cy + APEX_CAP));
        path.line_to((x, cy + APEX_CAP));
    }
    path.line_to((cx - r * sin_h - d * cos_h, cy - r * cos_h + d * sin_h));

    let steps = (angle_deg.round() as i64).max(10);
    for i in 0..=steps {
        // k runs -steps..=steps in steps of 2, so vertex i and steps-i mirror exactly
        let k = 2 * i - steps;
        let a = half * k as f64 / steps as f64;
        path.line_to(arc_point((cx, cy), r, a));
    }

    path.line_to((cx + r * sin_h + d * cos_h, cy - r * cos_h + d * sin_h));
    path.close_path();
    Ok(path)
}

/// Anti-aliased mask of [`wedge_path`].
pub fn build_wedge_mask(canvas: (u32, u32), angle_deg: f32) -> Result<Mask> {
    let path = wedge_path(canvas, angle_deg)?;
    to_mask(canvas, &path)
}

/// Filled circle of radius `min(w,h)/2` centred in the canvas.
pub fn build_disk_mask(canvas: (u32, u32)) -> Result<Mask> {
    let centre = Point::new(f64::from(canvas.0) / 2.0, f64::from(canvas.1) / 2.0);
    let r = f64::from(canvas.0.min(canvas.1)) / 2.0;
    let path = Circle::new(centre, r).to_path(CIRCLE_TOLERANCE);
    to_mask(canvas, &path)
}

fn arc_point(c: (f64, f64), r: f64, a: f64) -> Point {
    Point::new(c.0 + r * a.sin(), c.1 - r * a.cos())
}

fn to_mask(canvas: (u32, u32), path: &BezPath) -> Result<Mask> {
    let alpha = fill_coverage(canvas, path)?;
    Ok(Mask { width: canvas.0 as usize, height: canvas.1 as usize, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_polar(mask: &Mask, angle_deg: f32, r: f32) -> u8 {
        let (cx, cy) = (mask.width as f32 / 2.0, mask.height as f32 / 2.0);
        let a = angle_deg.to_radians();
        let x = (cx + r * a.sin()).floor() as usize;
        let y = (cy - r * a.cos()).floor() as usize;
        mask.at(x, y)
    }

    #[test]
    fn degenerate_angles_are_rejected() {
        assert!(build_wedge_mask((100, 100), 0.0).is_err());
        assert!(build_wedge_mask((100, 100), -10.0).is_err());
        assert!(build_wedge_mask((100, 100), 200.0).is_err());
        assert!(build_wedge_mask((100, 100), f32::NAN).is_err());
    }

    #[test]
    fn wedge_points_up_and_is_symmetric() {
        let m = build_wedge_mask((200, 200), 60.0).unwrap();
        assert_eq!(at_polar(&m, 0.0, 80.0), 255);
        assert_eq!(at_polar(&m, 25.0, 80.0), 255);
        assert_eq!(at_polar(&m, -25.0, 80.0), 255);
        assert_eq!(at_polar(&m, 40.0, 80.0), 0);
        assert_eq!(at_polar(&m, 180.0, 50.0), 0);
        let mut worst = 0u8;
        for y in 0..200 {
            for x in 0..200 {
                worst = worst.max(m.at(x, y).abs_diff(m.at(199 - x, y)));
            }
        }
        assert!(worst <= 2, "mirror mismatch of {worst}");
    }

    #[test]
    fn every_wedge_covers_the_centre_block() {
        for n in [2u32, 4, 6, 14, 16, 24, 64] {
            let m = build_wedge_mask((120, 120), 360.0 / n as f32).unwrap();
            for y in 57..63 {
                for x in 57..63 {
                    assert_eq!(m.at(x, y), 255, "n={n} ({x},{y})");
                }
            }
            // the tip behind the centre stays short
            assert_eq!(m.at(60, 60 + 2 * SEAM_OVERLAP as usize + 2), 0, "n={n}");
        }
    }

    #[test]
    fn wedges_tile_the_full_circle_without_gaps() {
        // Sample a ring; every angle is solidly inside at least one sector, and away
        // from the overlapping seams inside exactly one.
        for n in [2u32, 4, 6, 14, 16, 24] {
            let side = 240u32;
            let slice = 360.0 / n as f32;
            let m = build_wedge_mask((side, side), slice).unwrap();
            let r = side as f32 * 0.35;
            let seam_tol = ((SEAM_OVERLAP as f32 + 1.5) / r).to_degrees();
            let mut phi = -180.0f32;
            while phi < 180.0 {
                let hits = (0..n)
                    .filter(|&k| {
                        let mut local = phi - k as f32 * slice;
                        local = (local + 540.0).rem_euclid(360.0) - 180.0;
                        at_polar(&m, local, r) == 255
                    })
                    .count();
                assert!(hits >= 1, "gap at n={n} phi={phi}");
                let to_seam = {
                    let rel = (phi + slice / 2.0).rem_euclid(slice);
                    rel.min(slice - rel)
                };
                if to_seam > seam_tol {
                    assert_eq!(hits, 1, "n={n} phi={phi}");
                }
                phi += 0.25;
            }
        }
    }

    #[test]
    fn disk_area_matches_the_circle() {
        let d = build_disk_mask((300, 300)).unwrap();
        let area: f32 = d.alpha.iter().map(|&a| a as f32 / 255.0).sum();
        let expected = std::f32::consts::PI * 150.0 * 150.0;
        assert!((area / expected - 1.0).abs() < 0.005, "area={area} expected={expected}");
    }

    #[test]
    fn disk_is_clear_in_the_corners_and_solid_inside() {
        let d = build_disk_mask((100, 100)).unwrap();
        assert_eq!(d.at(0, 0), 0);
        assert_eq!(d.at(99, 99), 0);
        assert_eq!(d.at(50, 50), 255);
        assert_eq!(d.at(50, 2), 255);
        assert!(d.at(50, 0) > 128);
        assert!(d.at(0, 50) > 128);
    }
}

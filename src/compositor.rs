//! Kaleidoscope composition: one rotated wedge of the source, mirrored and repeated
//! into every sector, clipped to the disk.

use crate::blend::multiply_mask;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::mask::{build_disk_mask, build_wedge_mask};
use crate::transform::{Paint, draw_layers, mirror_x, pixmap_size, rotate_centered, rotation_about};
use crate::types::{Frame, Mask};

/// Owns the masks for exactly one geometry. A geometry change builds a new
/// compositor; masks are never edited in place.
#[derive(Debug)]
pub struct KaleidoscopeCompositor {
    geometry: Geometry,
    wedge: Mask,
    disk: Mask,
}

impl KaleidoscopeCompositor {
    pub fn new(geometry: Geometry) -> Result<Self> {
        let canvas = geometry.canvas_size();
        pixmap_size(canvas)?;
        let wedge = build_wedge_mask(canvas, geometry.slice_angle())?;
        let disk = build_disk_mask(canvas)?;
        tracing::debug!(
            slices = geometry.slices(),
            radius = geometry.radius(),
            wedge_px = wedge.coverage(),
            "built kaleidoscope masks"
        );
        Ok(Self { geometry, wedge, disk })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Compose one disk-clipped `2R x 2R` frame from `source` with the pattern turned
    /// by `theta_deg`. Pure function of its inputs.
    ///
    /// `source` must be a real frame; substituting a placeholder for a missing one is
    /// the caller's job.
    #[tracing::instrument(level = "trace", skip(self, source))]
    pub fn compose(&self, source: &Frame, theta_deg: f32) -> Result<Frame> {
        let canvas = self.geometry.canvas_size();
        let (cw, ch) = (f64::from(canvas.0), f64::from(canvas.1));
        let centre = (cw / 2.0, ch / 2.0);
        let slice_angle = self.geometry.slice_angle();

        // 1) turn the source and centre it on the canvas
        let mut base = rotate_centered(source, theta_deg, canvas)?;

        // 2) cut out the base wedge
        multiply_mask(&mut base, &self.wedge);
        let wedge = Paint::from_frame(&base)?;

        // 3) sector i is the wedge turned by -i * slice; odd sectors are mirrored first
        // so neighbours reflect each other across their shared seam
        let flip = mirror_x(cw);
        let layers: Vec<_> = (0..self.geometry.slices())
            .map(|i| {
                let turn = rotation_about(centre, -(i as f32) * slice_angle);
                let transform = if i % 2 == 1 { turn * flip } else { turn };
                (&wedge, transform)
            })
            .collect();
        let mut out = draw_layers(canvas, &layers)?;

        // 4) clip to the scope
        multiply_mask(&mut out, &self.disk);
        Ok(out)
    }
}

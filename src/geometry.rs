//! Kaleidoscope geometry: disk radius, square canvas, slice count and slice angle.
//!
//! A `Geometry` is a value. Changing the slice count or the viewport produces a new
//! one, and everything derived from it (masks, trail buffer) is rebuilt with it.

use crate::error::{Error, Result};

pub const MIN_SLICES: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    viewport: (usize, usize),
    radius: u32,
    slices: u32,
    slice_angle: f32,
}

impl Geometry {
    /// Geometry for a bare `2R x 2R` canvas (viewport == canvas).
    pub fn new(radius: u32, slices: u32) -> Result<Self> {
        let side = 2 * radius as usize;
        Self::build((side, side), radius as i64, slices)
    }

    /// Disk of radius `min(w,h)/2 - margin`, centred in the viewport.
    pub fn for_viewport(viewport: (usize, usize), slices: u32, margin: u32) -> Result<Self> {
        let radius = (viewport.0.min(viewport.1) / 2) as i64 - margin as i64;
        Self::build(viewport, radius, slices)
    }

    fn build(viewport: (usize, usize), radius: i64, slices: u32) -> Result<Self> {
        if radius <= 0 {
            return Err(Error::invalid_geometry(format!(
                "viewport {}x{} leaves no room for the disk (radius {radius})",
                viewport.0, viewport.1
            )));
        }
        if slices < MIN_SLICES || slices % 2 != 0 {
            return Err(Error::invalid_geometry(format!(
                "slice count must be an even number >= {MIN_SLICES}, got {slices}"
            )));
        }
        Ok(Self {
            viewport,
            radius: radius as u32,
            slices,
            slice_angle: 360.0 / slices as f32,
        })
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn slices(&self) -> u32 {
        self.slices
    }

    /// Degrees spanned by one wedge; `slice_angle * slices == 360`.
    pub fn slice_angle(&self) -> f32 {
        self.slice_angle
    }

    pub fn viewport(&self) -> (usize, usize) {
        self.viewport
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (2 * self.radius, 2 * self.radius)
    }

    /// Top-left corner of the canvas inside the viewport.
    pub fn canvas_offset(&self) -> (i64, i64) {
        let r = self.radius as i64;
        (self.viewport.0 as i64 / 2 - r, self.viewport.1 as i64 / 2 - r)
    }

    /// Same viewport and radius, different slice count.
    pub fn with_slices(&self, slices: u32) -> Result<Self> {
        Self::build(self.viewport, self.radius as i64, slices)
    }
}

/// Clamp a user-requested slice count to the nearest valid one (even, >= 2).
/// Odd values round up.
pub fn clamp_slices(requested: i64) -> u32 {
    let n = requested.max(MIN_SLICES as i64);
    let n = if n % 2 == 0 { n } else { n + 1 };
    n.min(u32::MAX as i64 - 1) as u32
}

//! Persistent viewport canvas that fades toward the background every tick, giving the
//! rotating pattern its motion trails.

use rayon::prelude::*;

use crate::blend::over_opaque;
use crate::types::{Frame, FrameBuffer, Rgb};

pub struct TrailBuffer {
    canvas: FrameBuffer,
    background: Rgb,
    /// Per-tick veil strength, 0 (never fades) ..= 255 (no trail at all).
    decay: u8,
}

impl TrailBuffer {
    pub fn new(viewport: (usize, usize), background: Rgb, decay: u8) -> Self {
        Self {
            canvas: FrameBuffer::new(viewport.0, viewport.1, background),
            background,
            decay,
        }
    }

    pub fn viewport(&self) -> (usize, usize) {
        (self.canvas.width, self.canvas.height)
    }

    /// Forget all trails.
    pub fn reset(&mut self) {
        self.canvas.fill(self.background);
    }

    /// Reallocate for a new viewport (comes back cleared).
    pub fn resize(&mut self, viewport: (usize, usize)) {
        self.canvas = FrameBuffer::new(viewport.0, viewport.1, self.background);
    }

    /// Decay, then composite `composed` with its top-left corner at `offset`.
    pub fn tick(&mut self, composed: &Frame, offset: (i64, i64)) -> &FrameBuffer {
        self.fade();
        self.composite(composed, offset);
        &self.canvas
    }

    /// One decay step: every channel moves toward the background by
    /// `ceil(|c - bg| * decay / 255)`, so any non-zero decay converges exactly.
    pub fn fade(&mut self) {
        let s = u32::from(self.decay);
        if s == 0 {
            return;
        }
        let bg = self.background;
        let step = |c: u8, b: u8| -> u8 {
            let (c32, b32) = (u32::from(c), u32::from(b));
            if c32 > b32 {
                (c32 - ((c32 - b32) * s).div_ceil(255)) as u8
            } else {
                (c32 + ((b32 - c32) * s).div_ceil(255)) as u8
            }
        };
        self.canvas.pixels.par_iter_mut().for_each(|px| {
            let c = Rgb::unpack(*px);
            *px = Rgb(step(c.0, bg.0), step(c.1, bg.1), step(c.2, bg.2)).pack();
        });
    }

    /// Alpha-composite a premultiplied frame at `offset`, clipped to the viewport.
    pub fn composite(&mut self, frame: &Frame, offset: (i64, i64)) {
        let (vw, vh) = (self.canvas.width as i64, self.canvas.height as i64);
        let (fw, fh) = (frame.width() as i64, frame.height() as i64);
        let x_start = offset.0.max(0);
        let x_end = (offset.0 + fw).min(vw);
        if x_start >= x_end {
            return;
        }
        for vy in offset.1.max(0)..(offset.1 + fh).min(vh) {
            let fy = (vy - offset.1) as u32;
            let row = &mut self.canvas.pixels[(vy * vw) as usize..((vy + 1) * vw) as usize];
            for vx in x_start..x_end {
                let src = frame.get_pixel((vx - offset.0) as u32, fy).0;
                let dst = &mut row[vx as usize];
                *dst = over_opaque(*dst, src);
            }
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.canvas
    }

    /// Direct access for overlays that belong to the trail (the waiting placeholder).
    pub fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.canvas
    }

    /// True when every pixel equals the background colour.
    pub fn is_clear(&self) -> bool {
        let bg = self.background.pack();
        self.canvas.pixels.iter().all(|&p| p == bg)
    }
}

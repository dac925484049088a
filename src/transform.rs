//! Drawing premultiplied RGBA frames under affine transforms, rendered with `vello_cpu`.
//!
//! Every rotation in the crate goes through [`rotation_about`], so there is exactly one
//! handedness: positive angles turn the image clockwise on screen (Y down), the same
//! convention the wedge mask uses for its angles.

use std::sync::Arc;

use vello_cpu::kurbo::{Affine, BezPath, Point, Rect};
use vello_cpu::peniko::color::PremulRgba8;

use crate::error::{Error, Result};
use crate::types::Frame;

/// A frame uploaded as an image paint, plus its size in pixels.
#[derive(Clone)]
pub struct Paint {
    image: vello_cpu::Image,
    width: f64,
    height: f64,
}

impl Paint {
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let (w, h) = pixmap_size((frame.width(), frame.height()))?;
        let mut may_have_opacities = false;
        let pixels = frame
            .pixels()
            .map(|p| {
                may_have_opacities |= p.0[3] != 255;
                PremulRgba8 { r: p.0[0], g: p.0[1], b: p.0[2], a: p.0[3] }
            })
            .collect();
        let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
        Ok(Self {
            image: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: f64::from(w),
            height: f64::from(h),
        })
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

/// Pixmaps are addressed with `u16` sides.
pub fn pixmap_size(size: (u32, u32)) -> Result<(u16, u16)> {
    let w: u16 = size
        .0
        .try_into()
        .map_err(|_| Error::render(format!("width {} exceeds u16", size.0)))?;
    let h: u16 = size
        .1
        .try_into()
        .map_err(|_| Error::render(format!("height {} exceeds u16", size.1)))?;
    if w == 0 || h == 0 {
        return Err(Error::render(format!("empty raster {}x{}", size.0, size.1)));
    }
    Ok((w, h))
}

/// Clockwise rotation by `angle_deg` about `centre`.
pub fn rotation_about(centre: (f64, f64), angle_deg: f32) -> Affine {
    Affine::rotate_about(f64::from(angle_deg).to_radians(), Point::new(centre.0, centre.1))
}

/// Mirror about the vertical line `x = width / 2` (left <-> right).
pub fn mirror_x(width: f64) -> Affine {
    Affine::new([-1.0, 0.0, 0.0, 1.0, width, 0.0])
}

/// Moves a `src`-sized image so its centre lands on the centre of `canvas`.
pub fn centre_on(src: (f64, f64), canvas: (f64, f64)) -> Affine {
    Affine::translate(((canvas.0 - src.0) / 2.0, (canvas.1 - src.1) / 2.0))
}

/// Draw every `(paint, transform)` layer, in order and source-over, onto a fresh
/// transparent `canvas`.
pub fn draw_layers(canvas: (u32, u32), layers: &[(&Paint, Affine)]) -> Result<Frame> {
    let (w, h) = pixmap_size(canvas)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint_transform(Affine::IDENTITY);
    for (paint, transform) in layers {
        ctx.set_transform(*transform);
        ctx.set_paint(paint.image.clone());
        ctx.fill_rect(&Rect::new(0.0, 0.0, paint.width, paint.height));
    }
    finish(ctx, w, h)
}

/// Anti-aliased coverage of `path` on a `canvas`-sized raster, one byte per pixel.
pub fn fill_coverage(canvas: (u32, u32), path: &BezPath) -> Result<Vec<u8>> {
    let (w, h) = pixmap_size(canvas)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_transform(Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    ctx.fill_path(path);
    let frame = finish(ctx, w, h)?;
    Ok(frame.pixels().map(|p| p.0[3]).collect())
}

/// Rotate `src` about its centre and place that centre at the centre of a fresh,
/// transparent `canvas`. Anything falling outside the canvas is cropped.
pub fn rotate_centered(src: &Frame, angle_deg: f32, canvas: (u32, u32)) -> Result<Frame> {
    let paint = Paint::from_frame(src)?;
    let (cw, ch) = (f64::from(canvas.0), f64::from(canvas.1));
    let transform = rotation_about((cw / 2.0, ch / 2.0), angle_deg) * centre_on(paint.size(), (cw, ch));
    draw_layers(canvas, &[(&paint, transform)])
}

fn finish(mut ctx: vello_cpu::RenderContext, w: u16, h: u16) -> Result<Frame> {
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    Frame::from_raw(u32::from(w), u32::from(h), pixmap.data_as_u8_slice().to_vec())
        .ok_or_else(|| Error::render("pixmap size does not match its dimensions"))
}

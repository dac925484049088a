// Premultiplied-alpha pixel arithmetic.
// Masks multiply all four channels (RGBA-multiply), which keeps premultiplied data
// consistent. Sector drawing itself goes through vello_cpu; what is left here is
// masking and the final "over" onto the opaque trail.

use crate::types::{Frame, Mask, Rgb};

pub type PremulRgba8 = [u8; 4];

#[inline]
pub fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Premultiplied `src` over an opaque packed 0x00RRGGBB pixel.
#[inline]
pub fn over_opaque(dst: u32, src: PremulRgba8) -> u32 {
    match src[3] {
        0 => dst,
        255 => Rgb(src[0], src[1], src[2]).pack(),
        sa => {
            let inv = 255 - u16::from(sa);
            let d = Rgb::unpack(dst);
            Rgb(
                src[0].saturating_add(mul_div255(u16::from(d.0), inv)),
                src[1].saturating_add(mul_div255(u16::from(d.1), inv)),
                src[2].saturating_add(mul_div255(u16::from(d.2), inv)),
            )
            .pack()
        }
    }
}

/// Scale every channel of `frame` by the mask alpha (pixels outside become transparent).
pub fn multiply_mask(frame: &mut Frame, mask: &Mask) {
    debug_assert_eq!((frame.width() as usize, frame.height() as usize), (mask.width, mask.height));
    for (px, &a) in frame.pixels_mut().zip(mask.alpha.iter()) {
        match a {
            255 => {}
            0 => px.0 = [0; 4],
            a => {
                for c in px.0.iter_mut() {
                    *c = mul_div255(u16::from(*c), u16::from(a));
                }
            }
        }
    }
}

/// Straight -> premultiplied alpha.
pub fn premultiply_in_place(frame: &mut Frame) {
    for px in frame.pixels_mut() {
        let a = u16::from(px.0[3]);
        if a == 255 {
            continue;
        }
        for c in px.0[..3].iter_mut() {
            *c = mul_div255(u16::from(*c), a);
        }
    }
}

/// Premultiplied -> straight alpha, for writing image files.
pub fn unpremultiply(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    for px in out.pixels_mut() {
        let a = px.0[3];
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.0[..3].iter_mut() {
            *c = ((u32::from(*c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
        }
    }
    out
}

// Core raster types shared by the compositor, the trail buffer and the window.

/// RGBA8 raster. Inside the compositor the channels are premultiplied by alpha;
/// frames coming out of a `FrameSource` are fully opaque, so both readings agree.
pub type Frame = image::RgbaImage;

/// What the window shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,      // viewport width (pixels)
    pub height: usize,     // viewport height (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, fill: Rgb) -> Self {
        Self { width, height, pixels: vec![fill.pack(); width * height] }
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color.pack());
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        Rgb::unpack(self.pixels[y * self.width + x])
    }
}

/// Alpha-only coverage raster: 255 fully inside the shape, 0 outside, partial along
/// anti-aliased edges. Built once per geometry and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<u8>,    // length = width * height
}

impl Mask {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.alpha[y * self.width + x]
    }

    /// Number of pixels the shape touches at all.
    pub fn coverage(&self) -> usize {
        self.alpha.iter().filter(|&&a| a > 0).count()
    }
}

/// Opaque colour, used for the background and HUD text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    #[inline]
    pub fn pack(self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }

    #[inline]
    pub fn unpack(px: u32) -> Self {
        Rgb(((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
    }
}

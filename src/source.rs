//! Frame sources: where the kaleidoscope gets its picture from.
//!
//! The render loop only talks to [`FrameSource`]; it never learns whether frames come
//! from a file loaded once or from a background decoder thread.

use std::path::Path;

use crate::blend::premultiply_in_place;
use crate::error::Result;
use crate::frame::rescale_linear;
use crate::live::StreamStatus;
use crate::types::Frame;

pub trait FrameSource {
    /// Short display name ("Cam1", file stem, ...).
    fn name(&self) -> &str;

    /// Latest available frame rescaled to `target`, premultiplied RGBA.
    /// Returns immediately; `None` means nothing has arrived yet.
    fn try_get_frame(&mut self, target: (u32, u32)) -> Option<Frame>;

    /// Connection state for sources that have one.
    fn status(&self) -> Option<StreamStatus> {
        None
    }

    /// Release background resources. Safe to call more than once.
    fn stop(&mut self) {}
}

/// One image decoded at startup; no I/O afterwards.
pub struct StaticImageSource {
    name: String,
    original: Frame,
    scaled: Option<Frame>,
}

impl StaticImageSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut frame = image::open(path)?.to_rgba8();
        premultiply_in_place(&mut frame);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());
        tracing::info!(path = %path.display(), w = frame.width(), h = frame.height(), "loaded image source");
        Ok(Self::from_frame(name, frame))
    }

    /// Wrap an already decoded, premultiplied frame.
    pub fn from_frame(name: impl Into<String>, frame: Frame) -> Self {
        Self { name: name.into(), original: frame, scaled: None }
    }
}

impl FrameSource for StaticImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_get_frame(&mut self, target: (u32, u32)) -> Option<Frame> {
        let stale = self.scaled.as_ref().is_none_or(|f| f.dimensions() != target);
        if stale {
            self.scaled = Some(rescale_linear(self.original.clone(), target));
        }
        self.scaled.clone()
    }
}

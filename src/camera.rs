// Local webcam as a VideoStream, via nokhwa.
// The camera is opened lazily on the producer thread; frames come back as RGB8.

use crate::error::{Error, Result};
use crate::frame::{DecodedFrame, PixelLayout};
use crate::live::VideoStream;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

pub struct CameraStream {
    index: u32,
    requested: (u32, u32),
    cam: Option<Camera>,
}

impl CameraStream {
    /// Nothing is touched until `open`; `width`/`height` are a hint, the device may pick another mode.
    pub fn new(index: u32, width: u32, height: u32) -> Self {
        Self { index, requested: (width, height), cam: None }
    }

    /// Resolution the device is actually delivering, once open.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.cam.as_ref().map(|c| {
            let r = c.resolution();
            (r.width(), r.height())
        })
    }
}

impl VideoStream for CameraStream {
    fn open(&mut self) -> Result<()> {
        self.close();
        let (width, height) = self.requested;

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(self.index), req)
            .map_err(|e| Error::CameraInit(format!("camera {}: {e}", self.index)))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("camera {} stream: {e}", self.index)))?;

        let actual = cam.resolution();
        tracing::debug!(index = self.index, w = actual.width(), h = actual.height(), "camera opened");
        self.cam = Some(cam);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.cam.is_some()
    }

    /// Blocks until the device hands over the next frame.
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        let cam = self
            .cam
            .as_mut()
            .ok_or_else(|| Error::CameraFrame("camera is not open".to_owned()))?;
        let raw = cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("fetch frame: {e}")))?;
        let rgb = raw
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("decode RGB: {e}")))?;
        let (w, h) = rgb.dimensions();
        DecodedFrame::new(w, h, PixelLayout::Rgb8, rgb.into_raw())
    }

    fn close(&mut self) {
        if let Some(mut cam) = self.cam.take() {
            if let Err(e) = cam.stop_stream() {
                tracing::debug!(index = self.index, error = %e, "camera stop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_before_open_fails_without_touching_the_device() {
        let mut s = CameraStream::new(7, 640, 480);
        assert!(!s.is_open());
        assert!(s.resolution().is_none());
        assert!(matches!(s.read_frame(), Err(Error::CameraFrame(_))));
    }
}

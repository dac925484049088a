//! Live kaleidoscope renderer.
//!
//! A frame source (still image, webcam or network stream) is cut into one wedge,
//! mirrored and repeated around a disk, rotated over time and composited into a
//! fading trail buffer. The library holds everything but the window; see
//! `src/main.rs` for the glue.

pub mod blend;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod draw;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod geometry;
pub mod live;
pub mod mask;
pub mod render_loop;
pub mod source;
pub mod trail;
pub mod transform;
pub mod types;

pub use compositor::KaleidoscopeCompositor;
pub use error::{Error, Result};
pub use geometry::Geometry;
pub use live::{LiveStreamSource, RetryPolicy, StreamStatus, VideoStream};
pub use render_loop::{Input, LoopState, RenderLoop, Settings};
pub use source::{FrameSource, StaticImageSource};
pub use trail::TrailBuffer;
pub use types::{Frame, FrameBuffer, Mask, Rgb};

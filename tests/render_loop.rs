use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use image::Rgba;
use kaleidoscope::frame::{DecodedFrame, PixelLayout};
use kaleidoscope::{
    Error, Frame, FrameSource, Input, LiveStreamSource, LoopState, RenderLoop, Result, RetryPolicy, Settings,
    StaticImageSource, VideoStream,
};

fn gradient() -> Box<dyn FrameSource> {
    let frame = Frame::from_fn(64, 64, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 120, 255]));
    Box::new(StaticImageSource::from_frame("gradient", frame))
}

fn still(slices: u32) -> Settings {
    Settings { slices, speed: 0.0, margin: 10, ..Settings::default() }
}

#[test]
fn slice_change_mid_run_leaves_no_trace_of_the_old_pattern() {
    let mut a = RenderLoop::new((160, 140), still(14), vec![gradient()]).unwrap();
    a.handle(Input::Start).unwrap();
    for _ in 0..5 {
        a.tick(1.0 / 60.0);
    }
    a.handle(Input::MoreSlices).unwrap();
    assert_eq!(a.geometry().slices(), 16);
    let after_change = a.tick(1.0 / 60.0).clone();

    let mut b = RenderLoop::new((160, 140), still(16), vec![gradient()]).unwrap();
    b.handle(Input::Start).unwrap();
    let fresh = b.tick(1.0 / 60.0).clone();

    assert_eq!(after_change, fresh);
}

#[test]
fn paused_pattern_settles_into_a_steady_trail() {
    let settings = Settings { speed: 90.0, decay: 60, margin: 10, ..Settings::default() };
    let mut r = RenderLoop::new((160, 140), settings, vec![gradient()]).unwrap();
    r.handle(Input::Start).unwrap();
    r.tick(0.25);
    r.handle(Input::TogglePause).unwrap();
    assert_eq!(r.state(), LoopState::Paused);
    let held = r.animation().angle();

    for _ in 0..100 {
        r.tick(0.1);
    }
    let settled = r.trail().frame().clone();
    r.tick(0.1);
    assert_eq!(r.trail().frame(), &settled);
    assert_eq!(r.animation().angle(), held);
}

/// Connects, then yields frames the test pushes.
struct Channel(mpsc::Receiver<DecodedFrame>, bool);

impl VideoStream for Channel {
    fn open(&mut self) -> Result<()> {
        self.1 = true;
        Ok(())
    }
    fn is_open(&self) -> bool {
        self.1
    }
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        self.0
            .recv_timeout(Duration::from_millis(5))
            .map_err(|e| Error::stream_read(e.to_string()))
    }
    fn close(&mut self) {
        self.1 = false;
    }
}

#[test]
fn live_source_shows_a_placeholder_until_the_first_frame() {
    let (tx, rx) = mpsc::channel();
    let policy = RetryPolicy { read_retry: Duration::from_millis(1), ..RetryPolicy::default() };
    let live = LiveStreamSource::spawn("Cam1", policy, move || Channel(rx, false)).unwrap();
    let mut r = RenderLoop::new((160, 140), still(6), vec![Box::new(live)]).unwrap();
    r.handle(Input::Start).unwrap();

    r.tick(0.016);
    assert!(r.is_waiting());
    assert!(r.snapshot().is_none());

    tx.send(DecodedFrame::new(2, 2, PixelLayout::Bgr8, [0, 0, 255].repeat(4)).unwrap()).unwrap();
    let end = Instant::now() + Duration::from_secs(3);
    while r.is_waiting() && Instant::now() < end {
        thread::sleep(Duration::from_millis(2));
        r.tick(0.016);
    }
    assert!(!r.is_waiting(), "frame arrived");
    let snap = r.snapshot().unwrap();
    let p = snap.get_pixel(60, 20).0;
    assert!(p[0] >= 253 && p[1] <= 2 && p[2] <= 2 && p[3] == 255, "{p:?}");

    r.handle(Input::Quit).unwrap();
    r.shutdown();
}

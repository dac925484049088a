use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kaleidoscope::frame::{DecodedFrame, PixelLayout};
use kaleidoscope::live::InterruptHandle;
use kaleidoscope::{Error, FrameSource, LiveStreamSource, Result, RetryPolicy, VideoStream};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        initial: ms(20),
        step: ms(10),
        max: ms(50),
        read_retry: ms(2),
        stop_timeout: ms(1000),
    }
}

fn wait_until(deadline: Duration, mut f: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if f() {
            return true;
        }
        thread::sleep(ms(2));
    }
    f()
}

fn solid(rgb: [u8; 3]) -> DecodedFrame {
    DecodedFrame::new(4, 4, PixelLayout::Rgb8, rgb.repeat(16)).unwrap()
}

/// Never connects.
struct Unreachable;

impl VideoStream for Unreachable {
    fn open(&mut self) -> Result<()> {
        Err(Error::stream_open("rtsp://10.255.255.1/none: connection timed out"))
    }
    fn is_open(&self) -> bool {
        false
    }
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        Err(Error::stream_read("not open"))
    }
    fn close(&mut self) {}
}

/// Hands out whatever the test pushes into the channel.
struct Fed {
    rx: Receiver<DecodedFrame>,
    open: bool,
    opens: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    /// Drop the connection after this many frames (simulates the peer going away).
    frames_per_connection: Option<usize>,
    served: usize,
}

impl Fed {
    fn new(rx: Receiver<DecodedFrame>) -> Self {
        Self {
            rx,
            open: false,
            opens: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            frames_per_connection: None,
            served: 0,
        }
    }
}

impl VideoStream for Fed {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.served = 0;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn is_open(&self) -> bool {
        self.open
    }
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        let frame = self
            .rx
            .recv_timeout(ms(5))
            .map_err(|e| Error::stream_read(e.to_string()))?;
        self.served += 1;
        if self.frames_per_connection.is_some_and(|n| self.served >= n) {
            self.open = false;
        }
        Ok(frame)
    }
    fn close(&mut self) {
        self.open = false;
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[test]
fn unreachable_stream_backs_off_and_stays_unavailable() {
    let mut src = LiveStreamSource::spawn("Cam1", policy(), || Unreachable).unwrap();

    let mut observed = Vec::new();
    let reached_cap = wait_until(ms(5000), || {
        assert!(src.try_get_frame((32, 32)).is_none());
        let s = src.status();
        observed.push(s.retry_delay);
        s.consecutive_failures >= 5
    });
    assert!(reached_cap, "producer kept retrying");

    let status = src.status();
    assert!(!status.connected);
    assert_eq!(status.retry_delay, ms(50), "backoff capped");
    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "backoff never shrinks: {observed:?}");
    assert!(observed.contains(&ms(30)) || observed.contains(&ms(40)));
    assert!(src.try_get_frame((32, 32)).is_none());

    let t = Instant::now();
    assert!(src.stop());
    assert!(t.elapsed() < ms(1000), "stop is not delayed by backoff sleeps");
}

#[test]
fn reader_always_sees_the_latest_complete_frame() {
    let (tx, rx): (Sender<DecodedFrame>, Receiver<DecodedFrame>) = mpsc::channel();
    let mut src = LiveStreamSource::spawn("Cam2", policy(), move || Fed::new(rx)).unwrap();

    assert!(wait_until(ms(2000), || src.status().connected));
    assert!(src.try_get_frame((8, 8)).is_none());

    tx.send(solid([255, 0, 0])).unwrap();
    assert!(wait_until(ms(2000), || src.status().frames_received == 1));
    let first = src.try_get_frame((8, 8)).unwrap();
    assert!(first.pixels().all(|p| p.0 == [255, 0, 0, 255]));

    tx.send(solid([0, 255, 0])).unwrap();
    assert!(wait_until(ms(2000), || src.status().frames_received == 2));
    let second = src.try_get_frame((8, 8)).unwrap();
    assert!(second.pixels().all(|p| p.0 == [0, 255, 0, 255]));

    // reads now time out; the last frame stays available
    thread::sleep(ms(30));
    assert!(src.try_get_frame((8, 8)).is_some());
    assert!(src.stop());
}

#[test]
fn lost_connection_is_reopened() {
    let (tx, rx) = mpsc::channel();
    let mut fed = Fed::new(rx);
    fed.frames_per_connection = Some(1);
    let opens = Arc::clone(&fed.opens);
    let mut src = LiveStreamSource::spawn("Cam3", policy(), move || fed).unwrap();

    for i in 0..3u8 {
        tx.send(solid([i, i, i])).unwrap();
    }
    assert!(wait_until(ms(3000), || src.status().frames_received == 3));
    assert!(opens.load(Ordering::SeqCst) >= 3, "one connection per frame");
    assert_eq!(src.try_get_frame((4, 4)).unwrap().get_pixel(0, 0).0, [2, 2, 2, 255]);
    src.stop();
}

#[test]
fn dropping_the_source_closes_the_stream() {
    let (_tx, rx) = mpsc::channel();
    let fed = Fed::new(rx);
    let closed = Arc::clone(&fed.closed);
    let src = LiveStreamSource::spawn("Cam4", policy(), move || fed).unwrap();
    assert!(wait_until(ms(2000), || src.status().connected));
    drop(src);
    assert!(closed.load(Ordering::SeqCst));
}

/// A read that only returns once its interrupt handle fires.
struct Stuck {
    open: bool,
    interrupted: Arc<AtomicBool>,
}

impl VideoStream for Stuck {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }
    fn is_open(&self) -> bool {
        self.open
    }
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        let start = Instant::now();
        while !self.interrupted.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(ms(5));
        }
        Err(Error::stream_read("interrupted"))
    }
    fn close(&mut self) {
        self.open = false;
    }
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let flag = Arc::clone(&self.interrupted);
        Some(InterruptHandle::new(move || flag.store(true, Ordering::SeqCst)))
    }
}

#[test]
fn stop_is_bounded_when_the_producer_hangs() {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    let policy = RetryPolicy { stop_timeout: ms(100), ..policy() };
    let mut src =
        LiveStreamSource::spawn("Cam5", policy, move || Stuck { open: false, interrupted: flag }).unwrap();
    assert!(wait_until(ms(2000), || src.status().connected));

    let t = Instant::now();
    assert!(!src.stop(), "producer is abandoned");
    assert!(t.elapsed() < ms(1000));
    assert!(interrupted.load(Ordering::SeqCst), "interrupt handle fired");
    assert!(src.stop(), "second stop is a no-op");
}

/// Connect never completes on its own; only the interrupt handle ends it.
struct HangingConnect {
    interrupted: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl VideoStream for HangingConnect {
    fn open(&mut self) -> Result<()> {
        let start = Instant::now();
        while !self.interrupted.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(ms(5));
        }
        Err(Error::stream_open("connect interrupted"))
    }
    fn is_open(&self) -> bool {
        false
    }
    fn read_frame(&mut self) -> Result<DecodedFrame> {
        Err(Error::stream_read("not connected"))
    }
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let flag = Arc::clone(&self.interrupted);
        Some(InterruptHandle::new(move || flag.store(true, Ordering::SeqCst)))
    }
}

#[test]
fn stop_unblocks_a_connect_that_never_returns() {
    let interrupted = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));
    let (i, c) = (Arc::clone(&interrupted), Arc::clone(&closed));
    let policy = RetryPolicy { stop_timeout: ms(100), ..policy() };
    let mut src =
        LiveStreamSource::spawn("Cam6", policy, move || HangingConnect { interrupted: i, closed: c }).unwrap();
    thread::sleep(ms(50));
    assert!(!src.status().connected);

    let t = Instant::now();
    assert!(!src.stop(), "producer is stuck in open");
    assert!(t.elapsed() < ms(1000));
    assert!(interrupted.load(Ordering::SeqCst), "interrupt reaches a pending connect");
    // the interrupted connect returns and the producer tears the stream down
    assert!(wait_until(ms(2000), || closed.load(Ordering::SeqCst)));
}

//! Live frame source fed by a background producer thread.
//!
//! The producer owns the [`VideoStream`] and loops: connect (with backoff) → read →
//! publish into a single-slot mailbox. The render thread only ever copies the latest
//! published frame out of the slot, so it never waits on the network or the decoder.
//!
//! Shutdown is cooperative: [`LiveStreamSource::stop`] clears the running flag, which
//! the producer polls on every iteration (and while sleeping), then waits a bounded
//! time for it to exit. A producer stuck inside a blocking connect or read is
//! abandoned after its stream's interrupt handle (if any) has been fired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::frame::DecodedFrame;
use crate::source::FrameSource;
use crate::types::Frame;

/// Longest single sleep while waiting; bounds how late a stop request is noticed.
const POLL_SLICE: Duration = Duration::from_millis(10);

/// A connection to something that yields decoded frames (network stream, webcam).
///
/// Implementations are created and used on the producer thread only.
pub trait VideoStream {
    /// Connect. Called whenever [`is_open`](Self::is_open) reports false.
    fn open(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Block until the next frame is decoded. A failed read leaves the connection
    /// up; implementations that detect the peer is gone should report
    /// `is_open() == false` afterwards so the producer reconnects.
    fn read_frame(&mut self) -> Result<DecodedFrame>;

    fn close(&mut self);

    /// Handle another thread may fire to unblock a read that never returns.
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        None
    }
}

/// Cloneable "tear the connection down now" callback.
#[derive(Clone)]
pub struct InterruptHandle(Arc<dyn Fn() + Send + Sync>);

impl InterruptHandle {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn fire(&self) {
        (self.0)()
    }
}

impl std::fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InterruptHandle")
    }
}

/// Reconnect and shutdown timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after the first failed connect.
    pub initial: Duration,
    /// Added to the wait after each further consecutive failure.
    pub step: Duration,
    /// Upper bound for the wait.
    pub max: Duration,
    /// Pause after a failed read before trying again.
    pub read_retry: Duration,
    /// How long `stop` waits for the producer to exit.
    pub stop_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            step: Duration::from_millis(500),
            max: Duration::from_millis(5000),
            read_retry: Duration::from_millis(20),
            stop_timeout: Duration::from_millis(1000),
        }
    }
}

/// Linear backoff: initial, initial+step, ... capped at max; reset on success.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, current: policy.initial }
    }

    /// Delay to wait before the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Record a failure: returns the delay to wait now and grows the next one.
    pub fn failed(&mut self) -> Duration {
        let wait = self.current;
        self.current = (self.current + self.policy.step).min(self.policy.max);
        wait
    }

    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }
}

/// Snapshot of the producer's view of the connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStatus {
    pub connected: bool,
    pub last_read_ok: bool,
    pub consecutive_failures: u32,
    /// Delay of the most recent reconnect wait.
    pub retry_delay: Duration,
    pub frames_received: u64,
}

struct Shared {
    /// Single-slot mailbox: latest complete frame, replaced wholesale.
    slot: Mutex<Option<Arc<DecodedFrame>>>,
    status: Mutex<StreamStatus>,
    running: AtomicBool,
    interrupt: Mutex<Option<InterruptHandle>>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn update_status(&self, f: impl FnOnce(&mut StreamStatus)) {
        f(&mut lock(&self.status));
    }

    fn publish(&self, frame: DecodedFrame) {
        let frame = Arc::new(frame);
        let previous = lock(&self.slot).replace(frame);
        drop(previous); // outside the lock
    }

    /// Sleep up to `total`, waking early once stop has been requested.
    fn sleep_while_running(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(POLL_SLICE));
        }
    }
}

/// The slot only ever holds a complete value, so a poisoned lock is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct LiveStreamSource {
    name: String,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    done_rx: Receiver<()>,
    stop_timeout: Duration,
}

impl LiveStreamSource {
    /// Start the producer thread. `make_stream` runs on that thread, so the stream
    /// type itself does not have to be `Send`.
    pub fn spawn<S, F>(name: impl Into<String>, policy: RetryPolicy, make_stream: F) -> Result<Self>
    where
        S: VideoStream + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let name = name.into();
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            status: Mutex::new(StreamStatus { retry_delay: policy.initial, ..Default::default() }),
            running: AtomicBool::new(true),
            interrupt: Mutex::new(None),
        });
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let shared_for_loop = Arc::clone(&shared);
        let name_for_loop = name.clone();
        let handle = thread::Builder::new()
            .name(format!("source-{name}"))
            .spawn(move || {
                let stream = make_stream();
                producer_loop(stream, &shared_for_loop, policy, &name_for_loop);
                let _ = done_tx.send(());
            })?;

        tracing::info!(source = %name, "started live source");
        Ok(Self {
            name,
            shared,
            handle: Some(handle),
            done_rx,
            stop_timeout: policy.stop_timeout,
        })
    }

    pub fn status(&self) -> StreamStatus {
        lock(&self.shared.status).clone()
    }

    /// Signal the producer, wait up to the stop timeout, then release.
    /// Returns false when the producer had to be abandoned.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        self.shared.running.store(false, Ordering::Release);

        match self.done_rx.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::warn!(source = %self.name, "producer thread panicked");
                }
                tracing::debug!(source = %self.name, "live source stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    source = %self.name,
                    timeout = ?self.stop_timeout,
                    "producer did not exit in time, abandoning it"
                );
                if let Some(interrupt) = lock(&self.shared.interrupt).take() {
                    interrupt.fire();
                }
                drop(handle); // detach
                false
            }
        }
    }
}

impl FrameSource for LiveStreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_get_frame(&mut self, target: (u32, u32)) -> Option<Frame> {
        let snapshot = lock(&self.shared.slot).clone()?;
        Some(snapshot.to_target(target))
    }

    fn status(&self) -> Option<StreamStatus> {
        Some(LiveStreamSource::status(self))
    }

    fn stop(&mut self) {
        LiveStreamSource::stop(self);
    }
}

impl Drop for LiveStreamSource {
    fn drop(&mut self) {
        LiveStreamSource::stop(self);
    }
}

fn producer_loop<S: VideoStream>(mut stream: S, shared: &Shared, policy: RetryPolicy, name: &str) {
    let mut backoff = Backoff::new(policy);
    let mut awaiting_first_frame = true;

    while shared.is_running() {
        if !stream.is_open() {
            // published before connecting: stop() must be able to cut a hanging connect
            *lock(&shared.interrupt) = stream.interrupt_handle();
            match stream.open() {
                Ok(()) => {
                    backoff.reset();
                    shared.update_status(|s| {
                        s.connected = true;
                        s.consecutive_failures = 0;
                    });
                    awaiting_first_frame = true;
                    tracing::info!(source = name, "stream connected");
                }
                Err(e) => {
                    let wait = backoff.failed();
                    shared.update_status(|s| {
                        s.connected = false;
                        s.last_read_ok = false;
                        s.consecutive_failures += 1;
                        s.retry_delay = wait;
                    });
                    if e.is_stream_failure() {
                        tracing::warn!(source = name, error = %e, retry_in = ?wait, "stream connect failed");
                    } else {
                        tracing::error!(source = name, error = %e, retry_in = ?wait, "unexpected error while connecting");
                    }
                    shared.sleep_while_running(wait);
                    continue;
                }
            }
        }

        match stream.read_frame() {
            Ok(frame) => {
                if awaiting_first_frame {
                    let (w, h) = frame.dimensions();
                    tracing::info!(source = name, w, h, "first frame received");
                    awaiting_first_frame = false;
                }
                shared.publish(frame);
                shared.update_status(|s| {
                    s.last_read_ok = true;
                    s.frames_received += 1;
                });
            }
            Err(e) => {
                let still_open = stream.is_open();
                shared.update_status(|s| {
                    s.last_read_ok = false;
                    s.connected = still_open;
                });
                if e.is_stream_failure() {
                    tracing::debug!(source = name, error = %e, still_open, "stream read failed");
                } else {
                    tracing::warn!(source = name, error = %e, still_open, "unexpected error while reading");
                }
                shared.sleep_while_running(policy.read_retry);
            }
        }
    }

    lock(&shared.interrupt).take();
    stream.close();
    tracing::debug!(source = name, "producer exiting");
}

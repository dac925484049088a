// Network/file video through the system `ffmpeg` binary.
// ffprobe reports the frame size once per connection; ffmpeg then decodes to raw RGB24
// on stdout and every frame is exactly width * height * 3 bytes.
// Both children live in the same slot, so the interrupt handle can kill whichever one
// is currently blocking the producer.

use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::frame::{DecodedFrame, PixelLayout};
use crate::live::{InterruptHandle, VideoStream};

/// Give up on a network peer that stops answering for this long.
const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FfmpegStream {
    uri: String,
    /// Shared with the interrupt handle so a stuck ffprobe or read can be unblocked by
    /// killing the running ffprobe/ffmpeg child.
    child: Arc<Mutex<Option<Child>>>,
    stdout: Option<ChildStdout>,
    size: (u32, u32),
}

impl FfmpegStream {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            child: Arc::new(Mutex::new(None)),
            stdout: None,
            size: (0, 0),
        }
    }

    /// Run ffprobe as an interruptible child and read the frame size from it.
    fn probe(&mut self) -> Result<(u32, u32)> {
        let mut child = probe_command(&self.uri)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::stream_open(format!("failed to run ffprobe: {e}")))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        *lock(&self.child) = Some(child);

        let mut json = Vec::new();
        if let Some(mut out) = stdout {
            let _ = out.read_to_end(&mut json);
        }
        let mut errors = String::new();
        if let Some(mut err) = stderr {
            let _ = err.read_to_string(&mut errors);
        }
        let status = match lock(&self.child).take() {
            Some(mut child) => child.wait()?,
            None => return Err(Error::stream_open(format!("ffprobe of '{}' was interrupted", self.uri))),
        };
        if !status.success() {
            return Err(Error::stream_open(format!(
                "ffprobe failed for '{}': {}",
                self.uri,
                errors.trim()
            )));
        }
        parse_probe_output(&json)
    }
}

fn lock(m: &Mutex<Option<Child>>) -> MutexGuard<'_, Option<Child>> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_rtsp(uri: &str) -> bool {
    uri.get(..7).is_some_and(|s| s.eq_ignore_ascii_case("rtsp://"))
}

/// Input options shared by ffprobe and ffmpeg: TCP for RTSP, and an I/O timeout (in
/// microseconds) for anything reached over the network. RTSP takes its socket timeout
/// as `-timeout` (ffmpeg 5 and later); other protocols take `-rw_timeout`.
fn input_args(uri: &str) -> Vec<String> {
    let micros = IO_TIMEOUT.as_micros().to_string();
    if is_rtsp(uri) {
        ["-rtsp_transport", "tcp", "-timeout", micros.as_str()].map(str::to_owned).to_vec()
    } else if uri.contains("://") {
        ["-rw_timeout", micros.as_str()].map(str::to_owned).to_vec()
    } else {
        Vec::new()
    }
}

fn probe_command(uri: &str) -> Command {
    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "error"]);
    cmd.args(input_args(uri));
    cmd.args([
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height",
        "-print_format",
        "json",
    ]);
    cmd.arg(uri);
    cmd
}

fn parse_probe_output(json: &[u8]) -> Result<(u32, u32)> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| Error::stream_open(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| Error::stream_open("no video stream found"))?;
    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(Error::stream_open("missing video size from ffprobe")),
    }
}

impl VideoStream for FfmpegStream {
    fn open(&mut self) -> Result<()> {
        self.close();
        let size = self.probe()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());
        cmd.args(["-loglevel", "error"]);
        cmd.args(input_args(&self.uri));
        cmd.args(["-i", &self.uri, "-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::stream_open(format!("failed to spawn ffmpeg (is it on PATH?): {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::stream_open("failed to open ffmpeg stdout"))?;

        tracing::debug!(uri = %self.uri, w = size.0, h = size.1, "ffmpeg decoder started");
        self.size = size;
        self.stdout = Some(stdout);
        *lock(&self.child) = Some(child);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stdout.is_some()
    }

    fn read_frame(&mut self) -> Result<DecodedFrame> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(Error::stream_read("stream is not open"));
        };
        let (w, h) = self.size;
        let mut data = vec![0u8; w as usize * h as usize * PixelLayout::Rgb8.bytes_per_pixel()];
        match stdout.read_exact(&mut data) {
            Ok(()) => DecodedFrame::new(w, h, PixelLayout::Rgb8, data),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                // decoder exited: drop the connection so the producer reconnects
                self.close();
                Err(Error::stream_read(format!("'{}' ended", self.uri)))
            }
            Err(e) => Err(Error::stream_read(format!("reading from ffmpeg: {e}"))),
        }
    }

    fn close(&mut self) {
        self.stdout = None;
        let child = lock(&self.child).take();
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        let child = Arc::clone(&self.child);
        Some(InterruptHandle::new(move || {
            if let Some(child) = lock(&child).as_mut() {
                let _ = child.kill();
            }
        }))
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.close();
    }
}

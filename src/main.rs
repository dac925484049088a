// What you SEE:
// • Splash screen with the controls; any key or click starts.
// • A turning, mirrored disk built from the active source, leaving fading trails.
// • SPACE next source, A pause, arrows/-/+ speed and slices, R clear trails.
// • P writes a PNG of the current pattern, ESC/Q quits.

mod window;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use clap::Parser;
use tracing::Level;

use kaleidoscope::camera::CameraStream;
use kaleidoscope::config::{Args, SourceSpec};
use kaleidoscope::ffmpeg::FfmpegStream;
use kaleidoscope::render_loop::BACKGROUND;
use kaleidoscope::{
    Frame, FrameBuffer, FrameSource, Input, LiveStreamSource, LoopState, RenderLoop, RetryPolicy,
    StaticImageSource,
};
use window::{Action, Drawer};

/// Mode requested from webcams; the device picks the closest one.
const CAMERA_REQUEST: (u32, u32) = (640, 480);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    /* --- Sources ---
       Live sources start connecting in the background right away. */
    let configured = args.sources()?;
    let sources = open_sources(&configured)?;

    /* --- Window + render loop --- */
    let mut drawer = Drawer::new("Kaleidoscope", args.width, args.height, args.fps)?; // visual: window opens
    let viewport = drawer.size();
    let mut engine = RenderLoop::new(viewport, args.settings(), sources)?;
    let mut screen = FrameBuffer::new(viewport.0, viewport.1, BACKGROUND);

    /* --- FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut fps = 0.0_f32;
    let mut last_frame_time = Instant::now();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !engine.is_terminated() {
        let now = Instant::now();
        let dt = (now - last_frame_time).as_secs_f32(); // visual: drives the rotation speed
        last_frame_time = now;

        /* 1) Inputs */
        for action in drawer.poll() {
            match action {
                Action::Snapshot if engine.state() != LoopState::Splash => {
                    snapshot(&mut engine, &args.snapshot_dir);
                }
                Action::Snapshot => handle(&mut engine, Input::Start),
                Action::Input(input) => handle(&mut engine, input),
            }
        }

        /* 2) Advance the animation and composite into the trails */
        engine.tick(dt); // visual: pattern turns, old frames fade

        /* 3) Trails + HUD (or the splash) onto the screen */
        engine.present(&mut screen, fps);
        drawer.present(&screen)?; // visual: the frame appears

        /* 4) FPS counter */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            fps = frames_this_second as f32 / secs;
            tracing::debug!(fps, "frame rate"); // terminal; the HUD shows the same number
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    engine.shutdown();
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn open_sources(entries: &[SourceSpec]) -> anyhow::Result<Vec<Box<dyn FrameSource>>> {
    let policy = RetryPolicy::default();
    let mut sources: Vec<Box<dyn FrameSource>> = Vec::with_capacity(entries.len());
    for entry in entries {
        let source: Box<dyn FrameSource> = match entry {
            SourceSpec::Image(path) => Box::new(
                StaticImageSource::open(path).with_context(|| format!("load image '{}'", path.display()))?,
            ),
            SourceSpec::Camera(index) => {
                let index = *index;
                Box::new(LiveStreamSource::spawn(entry.name(), policy, move || {
                    CameraStream::new(index, CAMERA_REQUEST.0, CAMERA_REQUEST.1)
                })?)
            }
            SourceSpec::Stream { name, uri } => {
                let uri = uri.clone();
                Box::new(LiveStreamSource::spawn(name.clone(), policy, move || FfmpegStream::new(uri))?)
            }
        };
        sources.push(source);
    }
    Ok(sources)
}

fn handle(engine: &mut RenderLoop, input: Input) {
    if let Err(e) = engine.handle(input) {
        tracing::warn!(?input, error = %e, "input ignored");
    }
}

fn snapshot(engine: &mut RenderLoop, dir: &Path) {
    let name = engine.active_name().to_owned();
    let Some(frame) = engine.snapshot() else {
        tracing::info!(source = %name, "no frame to snapshot yet");
        return;
    };
    match save_snapshot(dir, &name, &frame) {
        Ok(path) => tracing::info!(path = %path.display(), "saved snapshot"),
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "snapshot failed"),
    }
}

/// `<dir>/<name>_snap_<unix seconds>.png`
fn save_snapshot(dir: &Path, name: &str, frame: &Frame) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create snapshot dir '{}'", dir.display()))?;
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("{}_snap_{secs}.png", name.replace(' ', "_")));
    frame
        .save(&path)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(path)
}

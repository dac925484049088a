//! The per-frame driver: splash screen, then running/paused animation over the active
//! source, with trails.
//!
//! Everything here is single-threaded and window-agnostic. The binary turns window
//! events into [`Input`]s, calls [`RenderLoop::tick`] once per frame and hands the
//! result of [`RenderLoop::present`] to the window. Geometry changes rebuild the
//! compositor before the next composite, so no frame ever mixes masks of two
//! geometries.

use crate::blend::unpremultiply;
use crate::compositor::KaleidoscopeCompositor;
use crate::draw::{draw_splash, draw_text_centered, draw_text_scaled};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, clamp_slices};
use crate::live::StreamStatus;
use crate::source::FrameSource;
use crate::trail::TrailBuffer;
use crate::types::{Frame, FrameBuffer, Rgb};

pub const BACKGROUND: Rgb = Rgb(14, 16, 20);
const HUD_COLOR: Rgb = Rgb(225, 225, 230);
const WAITING_COLOR: Rgb = Rgb(200, 200, 210);
const SPLASH_COLOR: Rgb = Rgb(230, 232, 236);
const HUD_SCALE: i32 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Requested slice count; clamped to an even number >= 2.
    pub slices: u32,
    /// Degrees per second, either sign.
    pub speed: f32,
    /// Change per SpeedUp/SpeedDown.
    pub speed_step: f32,
    /// Trail decay per tick, 0 (endless trails) ..= 255 (no trails).
    pub decay: u8,
    /// Gap between the disk and the nearest viewport edge.
    pub margin: u32,
    pub background: Rgb,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slices: 14,
            speed: 34.0,
            speed_step: 2.0,
            decay: 30,
            margin: 30,
            background: BACKGROUND,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    angle: f32,
    velocity: f32,
    paused: bool,
}

impl AnimationState {
    pub fn new(velocity: f32) -> Self {
        Self { angle: 0.0, velocity, paused: false }
    }

    /// Current pattern rotation in degrees, always in `[0, 360)`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn advance(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let a = (self.angle + self.velocity * dt).rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        self.angle = if a >= 360.0 { 0.0 } else { a };
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn nudge_velocity(&mut self, delta: f32) {
        self.velocity += delta;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Splash,
    Running,
    Paused,
    Terminated,
}

/// What the user asked for this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// Any key or click without a binding; leaves the splash screen.
    Start,
    Quit,
    TogglePause,
    SpeedUp,
    SpeedDown,
    MoreSlices,
    FewerSlices,
    NextSource,
    ResetTrails,
    /// New window client size.
    Resize(usize, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Splash,
    Active,
    Terminated,
}

pub struct RenderLoop {
    settings: Settings,
    phase: Phase,
    animation: AnimationState,
    compositor: KaleidoscopeCompositor,
    trail: TrailBuffer,
    sources: Vec<Box<dyn FrameSource>>,
    active: usize,
    waiting: bool,
}

impl RenderLoop {
    pub fn new(viewport: (usize, usize), settings: Settings, sources: Vec<Box<dyn FrameSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::config("at least one frame source is required"));
        }
        let slices = clamp_slices(i64::from(settings.slices));
        let geometry = Geometry::for_viewport(viewport, slices, settings.margin)?;
        let compositor = KaleidoscopeCompositor::new(geometry)?;
        let trail = TrailBuffer::new(viewport, settings.background, settings.decay);
        tracing::info!(
            w = viewport.0,
            h = viewport.1,
            slices,
            radius = geometry.radius(),
            sources = sources.len(),
            "render loop ready"
        );
        Ok(Self {
            animation: AnimationState::new(settings.speed),
            settings,
            phase: Phase::Splash,
            compositor,
            trail,
            sources,
            active: 0,
            waiting: false,
        })
    }

    pub fn state(&self) -> LoopState {
        match self.phase {
            Phase::Splash => LoopState::Splash,
            Phase::Terminated => LoopState::Terminated,
            Phase::Active if self.animation.is_paused() => LoopState::Paused,
            Phase::Active => LoopState::Running,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn geometry(&self) -> &Geometry {
        self.compositor.geometry()
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    pub fn active_name(&self) -> &str {
        self.sources[self.active].name()
    }

    /// True when the last tick found no frame and drew the placeholder.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Apply one input. An error (e.g. a window too small for the disk) leaves the
    /// previous state untouched.
    pub fn handle(&mut self, input: Input) -> Result<()> {
        match input {
            Input::Quit => {
                self.phase = Phase::Terminated;
                return Ok(());
            }
            Input::Resize(w, h) => return self.resize((w, h)),
            _ => {}
        }

        match self.phase {
            Phase::Terminated => {}
            Phase::Splash => {
                tracing::debug!("leaving splash screen");
                self.phase = Phase::Active;
            }
            Phase::Active => match input {
                Input::TogglePause => self.animation.toggle_pause(),
                Input::SpeedUp => self.animation.nudge_velocity(self.settings.speed_step),
                Input::SpeedDown => self.animation.nudge_velocity(-self.settings.speed_step),
                Input::MoreSlices => self.set_slices(i64::from(self.geometry().slices()) + 2)?,
                Input::FewerSlices => self.set_slices(i64::from(self.geometry().slices()) - 2)?,
                Input::NextSource => self.next_source(),
                Input::ResetTrails => self.trail.reset(),
                Input::Start | Input::Quit | Input::Resize(..) => {}
            },
        }
        Ok(())
    }

    /// Change the slice count (clamped). Masks are rebuilt and trails cleared.
    pub fn set_slices(&mut self, requested: i64) -> Result<()> {
        let slices = clamp_slices(requested);
        if slices == self.geometry().slices() {
            return Ok(());
        }
        let geometry = self.geometry().with_slices(slices)?;
        self.rebuild(geometry)
    }

    /// Follow a new viewport size: new radius, new masks, fresh trail buffer.
    pub fn resize(&mut self, viewport: (usize, usize)) -> Result<()> {
        if viewport == self.trail.viewport() {
            return Ok(());
        }
        let geometry = Geometry::for_viewport(viewport, self.geometry().slices(), self.settings.margin)?;
        self.rebuild(geometry)
    }

    fn rebuild(&mut self, geometry: Geometry) -> Result<()> {
        // build first so a failure keeps the old compositor
        let compositor = KaleidoscopeCompositor::new(geometry)?;
        self.compositor = compositor;
        if self.trail.viewport() == geometry.viewport() {
            self.trail.reset();
        } else {
            self.trail.resize(geometry.viewport());
        }
        tracing::debug!(
            slices = geometry.slices(),
            radius = geometry.radius(),
            w = geometry.viewport().0,
            h = geometry.viewport().1,
            "geometry changed"
        );
        Ok(())
    }

    pub fn next_source(&mut self) {
        self.active = (self.active + 1) % self.sources.len();
        self.trail.reset();
        tracing::info!(source = self.active_name(), index = self.active, "switched source");
    }

    /// Advance one frame. Outside the running/paused states the trail is left as is.
    pub fn tick(&mut self, dt: f32) -> &FrameBuffer {
        if self.phase == Phase::Active {
            self.animation.advance(dt);
            self.render_active();
        }
        self.trail.frame()
    }

    fn render_active(&mut self) {
        let geometry = *self.compositor.geometry();
        let source = &mut self.sources[self.active];
        match source.try_get_frame(geometry.canvas_size()) {
            Some(frame) => match self.compositor.compose(&frame, self.animation.angle()) {
                Ok(composed) => {
                    self.trail.tick(&composed, geometry.canvas_offset());
                    self.waiting = false;
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "compose failed");
                    self.trail.fade();
                }
            },
            None => {
                let msg = format!("WAITING FOR {}...", source.name());
                let retry = source.status().and_then(|s| retry_line(&s));
                self.trail.fade();
                let cy = self.trail.viewport().1 as i32 / 2;
                draw_text_centered(self.trail.frame_mut(), cy, &msg, WAITING_COLOR, HUD_SCALE);
                if let Some(line) = retry {
                    draw_text_centered(self.trail.frame_mut(), cy + 12 * HUD_SCALE, &line, WAITING_COLOR, 1);
                }
                self.waiting = true;
            }
        }
    }

    /// The current kaleidoscope of the active source as a straight-alpha `2R x 2R`
    /// image, or `None` while that source has nothing to show.
    pub fn snapshot(&mut self) -> Option<Frame> {
        let canvas = self.compositor.geometry().canvas_size();
        let frame = self.sources[self.active].try_get_frame(canvas)?;
        match self.compositor.compose(&frame, self.animation.angle()) {
            Ok(composed) => Some(unpremultiply(&composed)),
            Err(e) => {
                tracing::warn!(error = %e, "compose failed");
                None
            }
        }
    }

    pub fn hud_text(&self, fps: f32) -> String {
        let paused = if self.animation.is_paused() { " | PAUSED" } else { "" };
        format!(
            "{} | SPEED: {:.1} DEG/S | SLICES: {}{} | FPS: {:.1}",
            self.active_name(),
            self.animation.velocity(),
            self.geometry().slices(),
            paused,
            fps
        )
    }

    /// Fill `screen` with what the window should show: the splash screen, or the
    /// trail buffer with the HUD on top. The HUD never enters the trail buffer.
    pub fn present(&self, screen: &mut FrameBuffer, fps: f32) {
        let (w, h) = self.trail.viewport();
        if (screen.width, screen.height) != (w, h) {
            *screen = FrameBuffer::new(w, h, self.settings.background);
        }
        match self.phase {
            Phase::Splash => {
                let loaded = format!("LOADED SOURCES: {}", self.sources.len());
                let lines = [
                    loaded.as_str(),
                    "SPACE - NEXT SOURCE",
                    "ESC OR Q - QUIT",
                    "A - PAUSE / RESUME",
                    "LEFT/RIGHT OR -/+ - CHANGE SPEED",
                    "UP/DOWN - CHANGE SLICES (+-2)",
                    "P - SAVE SNAPSHOT (PNG)",
                    "R - CLEAR TRAILS",
                    "ANY KEY OR CLICK - START",
                ];
                draw_splash(screen, self.settings.background, "KALEIDOSCOPE", &lines, SPLASH_COLOR);
            }
            Phase::Active | Phase::Terminated => {
                screen.pixels.copy_from_slice(&self.trail.frame().pixels);
                if !self.waiting {
                    let y = h as i32 - 30;
                    draw_text_scaled(screen, 10, y, &self.hud_text(fps), HUD_COLOR, HUD_SCALE);
                }
            }
        }
    }

    /// Stop every source's background work.
    pub fn shutdown(&mut self) {
        for source in &mut self.sources {
            source.stop();
        }
        tracing::info!(sources = self.sources.len(), "sources stopped");
    }
}

/// "RETRY IN 2.5S (3 FAILED)" while a live source keeps failing to connect.
fn retry_line(status: &StreamStatus) -> Option<String> {
    if status.connected || status.consecutive_failures == 0 {
        return None;
    }
    Some(format!(
        "RETRY IN {:.1}S ({} FAILED)",
        status.retry_delay.as_secs_f32(),
        status.consecutive_failures
    ))
}

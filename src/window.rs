// The on-screen window: presents the software raster and turns keys, clicks and
// resizes into render-loop inputs.

use kaleidoscope::{Error, FrameBuffer, Input, Result};
use minifb::{Key, KeyRepeat, MouseButton, ScaleMode, Window, WindowOptions};

/// One thing the user did this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Input(Input),
    /// Save the current kaleidoscope as a PNG.
    Snapshot,
}

pub struct Drawer {
    window: Window,          // the on-screen window you see
    size: (usize, usize),    // last size we reported; a change means "resize"
    mouse_was_down: bool,    // for click edges, not held buttons
}

impl Drawer {
    /// Create a resizable window capped at `fps` updates per second.
    /// Visual: an empty window appears with the given title.
    pub fn new(title: &str, width: usize, height: usize, fps: usize) -> Result<Self> {
        let opts = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::UpperLeft,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, width, height, opts).map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(fps);
        Ok(Self { window, size: (width, height), mouse_was_down: false })
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: the window immediately shows the new trail + HUD (or the splash).
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Returns false once the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    /// Everything that happened since the last call, in a stable order:
    /// resize first, then keys, then the click.
    pub fn poll(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        let size = self.window.get_size();
        if size != self.size && size.0 > 0 && size.1 > 0 {
            self.size = size;
            actions.push(Action::Input(Input::Resize(size.0, size.1)));
        }

        actions.extend(self.window.get_keys_pressed(KeyRepeat::No).into_iter().map(map_key));

        // a click only matters on the splash (it starts the show)
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            actions.push(Action::Input(Input::Start));
        }
        self.mouse_was_down = down;

        actions
    }
}

fn map_key(key: Key) -> Action {
    let input = match key {
        Key::P => return Action::Snapshot, // a PNG lands in the snapshot dir
        Key::Escape | Key::Q => Input::Quit,
        Key::Space => Input::NextSource,
        Key::A => Input::TogglePause,
        Key::Right | Key::Equal | Key::NumPadPlus => Input::SpeedUp,
        Key::Left | Key::Minus | Key::NumPadMinus => Input::SpeedDown,
        Key::Up => Input::MoreSlices,
        Key::Down => Input::FewerSlices,
        Key::R => Input::ResetTrails,
        _ => Input::Start, // any other key leaves the splash
    };
    Action::Input(input)
}

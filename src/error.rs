// One error type for the whole core. Every variant states *where* things went wrong.
// Source-side failures (stream open/read) never leave the producer thread; the
// render loop only ever sees "no frame yet".

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Creating the window failed.
    #[error("window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed.
    #[error("window update error: {0}")]
    WindowUpdate(String),

    /// Opening/starting a local camera failed.
    #[error("camera init error: {0}")]
    CameraInit(String),

    /// Grabbing/decoding a camera frame failed.
    #[error("camera frame error: {0}")]
    CameraFrame(String),

    /// Connecting to a live stream failed.
    #[error("stream open error: {0}")]
    StreamOpen(String),

    /// Reading the next decoded frame from an open stream failed.
    #[error("stream read error: {0}")]
    StreamRead(String),

    /// Slice count / radius outside what the mask builder accepts.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Rasterizing masks or drawing frames failed.
    #[error("render error: {0}")]
    Render(String),

    /// Bad user configuration (CLI or .env).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn stream_open(msg: impl Into<String>) -> Self {
        Self::StreamOpen(msg.into())
    }

    pub fn stream_read(msg: impl Into<String>) -> Self {
        Self::StreamRead(msg.into())
    }

    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the expected ways a live connection fails (peer gone, decoder hiccup).
    /// The producer retries everything, but logs anything else as unexpected.
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Error::StreamOpen(_) | Error::StreamRead(_) | Error::CameraInit(_) | Error::CameraFrame(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_stage() {
        let e = Error::stream_open("rtsp://cam: connection refused");
        assert_eq!(e.to_string(), "stream open error: rtsp://cam: connection refused");
        assert!(e.is_stream_failure());
        assert!(!Error::invalid_geometry("odd slices").is_stream_failure());
    }
}

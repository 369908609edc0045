// ── Device ports ──
//
// The hardware driver sits behind these two traits. Everything the
// channel guarantees — open-on-worker, transient-read retry, ordering,
// cooperative cancellation — is implemented against the port, so any
// V4L2/DirectShow/GStreamer-backed source slots in without touching the
// loop logic (and tests drive the loop with scripted sources).

use crate::error::VideoError;
use crate::frame::{CaptureConfig, Frame};

/// A blocking frame producer for one opened device.
///
/// `read_frame` blocks until the next frame, returning `Ok(None)` for an
/// empty/transient read. The device handle is released when the source is
/// dropped.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// Opens capture devices by integer index.
///
/// `open` may be slow (driver negotiation, format selection); the channel
/// always calls it from a blocking worker. A failure is terminal for that
/// open attempt and reported synchronously to the caller.
pub trait CaptureBackend: Send + 'static {
    type Source: FrameSource + 'static;

    fn open(&self, device_index: u32, config: &CaptureConfig) -> Result<Self::Source, VideoError>;
}

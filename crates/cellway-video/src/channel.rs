//! Per-camera capture channel.
//!
//! One [`VideoChannel`] owns one capture device. Opening runs on a
//! blocking worker and either yields a handle or a typed
//! [`VideoError::DeviceUnavailable`] — it never blocks the caller's async
//! context and never panics across the boundary. On success a dedicated
//! worker loop reads frames until cancellation, backing off briefly on
//! transient failures; a single bad frame never ends the loop.
//!
//! Frames fan out through a [`broadcast`] channel: subscribers receive
//! them in capture order, a lagging subscriber loses the oldest frames
//! (never reordered, never duplicated), and the worker never blocks on a
//! slow consumer.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellway_video::{CaptureConfig, SyntheticBackend, VideoChannel};
//!
//! let channel = VideoChannel::open(SyntheticBackend::new(3), 0, CaptureConfig::default()).await?;
//! let mut frames = channel.frames();
//! while let Ok(frame) = frames.recv().await {
//!     println!("{}x{}", frame.width, frame.height);
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::VideoError;
use crate::frame::{CaptureConfig, Frame};
use crate::source::{CaptureBackend, FrameSource};

const FRAME_CHANNEL_CAPACITY: usize = 16;

// ── ChannelState ─────────────────────────────────────────────────────

/// Lifecycle of a channel, observable via [`VideoChannel::state`].
///
/// "Uninitialized" and "failed to open" have no runtime representation:
/// before `open` there is no channel, and an open failure returns an
/// error instead of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Opening,
    Streaming,
    Stopped,
}

// ── VideoChannel ─────────────────────────────────────────────────────

/// Handle to a running capture worker.
///
/// Owned exclusively by its creator. Cancellation is cooperative: the
/// worker checks once per loop iteration, so stopping takes at most one
/// per-iteration sleep (tens of milliseconds). Dropping the handle also
/// cancels the worker.
pub struct VideoChannel {
    device_index: u32,
    frames: broadcast::Sender<Arc<Frame>>,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl VideoChannel {
    /// Open device `device_index` through `backend` and start capturing.
    ///
    /// The open itself runs on a blocking worker; a failure is terminal
    /// for this channel and reported synchronously — there is no
    /// automatic reopen, that policy belongs to the caller.
    pub async fn open<B: CaptureBackend>(
        backend: B,
        device_index: u32,
        config: CaptureConfig,
    ) -> Result<Self, VideoError> {
        let (state, _) = watch::channel(ChannelState::Opening);
        let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let open_config = config.clone();
        let source = tokio::task::spawn_blocking(move || backend.open(device_index, &open_config))
            .await
            .map_err(|e| VideoError::DeviceUnavailable {
                device_index,
                reason: format!("open worker failed: {e}"),
            })??;

        let worker = tokio::task::spawn_blocking({
            let frames = frames.clone();
            let state = state.clone();
            let cancel = cancel.clone();
            move || capture_loop(source, device_index, &config, &frames, &state, &cancel)
        });

        Ok(Self {
            device_index,
            frames,
            state,
            cancel,
            worker: Some(worker),
        })
    }

    /// The device index this channel captures from.
    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    /// Get a new receiver for the frame stream.
    pub fn frames(&self) -> broadcast::Receiver<Arc<Frame>> {
        self.frames.subscribe()
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Request cooperative cancellation of the capture worker.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Await worker termination. Call [`cancel`](Self::cancel) first —
    /// an uncancelled channel runs until its handle is dropped.
    pub async fn closed(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for VideoChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Capture worker ───────────────────────────────────────────────────

/// Blocking loop: read one frame, publish, pace; back off and retry on a
/// transient failure. Runs until the token is cancelled. The source (and
/// with it the device handle) is released when this returns, even if
/// cancellation lands mid-iteration.
fn capture_loop<S: FrameSource>(
    mut source: S,
    device_index: u32,
    config: &CaptureConfig,
    frames: &broadcast::Sender<Arc<Frame>>,
    state: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
) {
    let _ = state.send(ChannelState::Streaming);
    debug!(device_index, "capture loop started");

    while !cancel.is_cancelled() {
        match source.read_frame() {
            Ok(Some(frame)) => {
                // A send error only means no subscriber right now.
                let _ = frames.send(Arc::new(frame));
                std::thread::sleep(config.frame_interval);
            }
            Ok(None) => {
                trace!(device_index, "empty read, retrying");
                std::thread::sleep(config.retry_backoff);
            }
            Err(e) => {
                trace!(device_index, error = %e, "transient read failure, retrying");
                std::thread::sleep(config.retry_backoff);
            }
        }
    }

    let _ = state.send(ChannelState::Stopped);
    debug!(device_index, "capture loop stopped");
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticBackend;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::time::timeout;

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            frame_interval: Duration::from_millis(10),
            retry_backoff: Duration::from_millis(1),
            ..CaptureConfig::default()
        }
    }

    #[tokio::test]
    async fn open_failure_is_typed_and_terminal() {
        let result = VideoChannel::open(SyntheticBackend::new(0), 0, fast_config()).await;
        assert!(matches!(
            result,
            Err(VideoError::DeviceUnavailable { device_index: 0, .. })
        ));
    }

    #[tokio::test]
    async fn frames_arrive_in_capture_order() {
        let channel = VideoChannel::open(SyntheticBackend::new(1), 0, fast_config())
            .await
            .expect("open");
        let mut rx = channel.frames();

        let mut last_shade = 0u8;
        for _ in 0..5 {
            let frame = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("frame in time")
                .expect("stream alive");
            assert!(frame.data[0] > last_shade, "shades must be strictly rising");
            last_shade = frame.data[0];
        }

        channel.cancel();
        channel.closed().await;
    }

    #[tokio::test]
    async fn cancel_stops_within_a_bounded_time() {
        let channel = VideoChannel::open(SyntheticBackend::new(1), 0, fast_config())
            .await
            .expect("open");
        let mut state = channel.state();

        channel.cancel();
        timeout(Duration::from_secs(2), channel.closed())
            .await
            .expect("worker should stop promptly after cancel");

        state
            .wait_for(|s| *s == ChannelState::Stopped)
            .await
            .expect("state should reach Stopped");
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_the_worker() {
        let channel = VideoChannel::open(SyntheticBackend::new(1), 0, fast_config())
            .await
            .expect("open");
        let mut rx = channel.frames();
        drop(channel);

        // Once the worker exits, the last sender is gone and the stream
        // ends (buffered frames may drain first).
        let ended = timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "stream should close after the handle drops");
    }

    // A source that fails twice before producing, to prove the loop
    // retries transient failures instead of exiting.
    struct FlakyBackend;
    struct FlakySource {
        calls: u8,
    }

    impl CaptureBackend for FlakyBackend {
        type Source = FlakySource;

        fn open(&self, _index: u32, _config: &CaptureConfig) -> Result<FlakySource, VideoError> {
            Ok(FlakySource { calls: 0 })
        }
    }

    impl FrameSource for FlakySource {
        fn read_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            self.calls = self.calls.saturating_add(1);
            match self.calls {
                1 => Ok(None),
                2 => Err(VideoError::ReadFailed("usb glitch".into())),
                n => Ok(Some(Frame::new(2, 2, Bytes::from(vec![n; 4])))),
            }
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_in_loop() {
        let channel = VideoChannel::open(FlakyBackend, 0, fast_config())
            .await
            .expect("open");
        let mut rx = channel.frames();

        let frame = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("frame in time")
            .expect("stream alive");
        // Two failed attempts preceded the first delivered frame.
        assert_eq!(frame.data[0], 3);

        channel.cancel();
        channel.closed().await;
    }
}

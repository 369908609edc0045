// ── Frame and capture configuration types ──

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An immutable decoded image.
///
/// Shared as `Arc<Frame>` through the channel's broadcast; subscribers
/// that need the pixels beyond the current message clone the cheap
/// [`Bytes`] handle.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Bytes) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }
}

/// Fixed capture configuration, applied once at device-open time.
///
/// The defaults mirror the cell's station cameras: 640×640 at 15 fps with
/// boosted brightness and shortened exposure for the shop-floor lighting.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,

    /// Driver brightness setting, if the device supports one.
    pub brightness: Option<i32>,
    /// Driver exposure setting, if the device supports one.
    pub exposure: Option<i32>,

    /// Minimum delay between delivered frames. Caps throughput (~30 fps at
    /// the 33 ms default) independent of what the device reports.
    pub frame_interval: Duration,

    /// Backoff after a transient read failure before the next attempt.
    pub retry_backoff: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            frame_rate: 15,
            brightness: Some(100),
            exposure: Some(-5),
            frame_interval: Duration::from_millis(33),
            retry_backoff: Duration::from_millis(10),
        }
    }
}

//! Generated test-pattern source.
//!
//! Stands in for real cameras in tests and headless development. Each
//! frame is a solid gray ramp that steps with the frame sequence, so a
//! consumer can verify ordering by looking at the first byte.

use bytes::Bytes;

use crate::error::VideoError;
use crate::frame::{CaptureConfig, Frame};
use crate::source::{CaptureBackend, FrameSource};

/// Backend pretending to own `devices` cameras at indexes `0..devices`.
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    pub devices: u32,
}

impl SyntheticBackend {
    pub fn new(devices: u32) -> Self {
        Self { devices }
    }
}

impl CaptureBackend for SyntheticBackend {
    type Source = SyntheticSource;

    fn open(&self, device_index: u32, config: &CaptureConfig) -> Result<Self::Source, VideoError> {
        if device_index >= self.devices {
            return Err(VideoError::DeviceUnavailable {
                device_index,
                reason: format!("no such device (have {})", self.devices),
            });
        }
        Ok(SyntheticSource {
            width: config.width,
            height: config.height,
            sequence: 0,
            drop_every: None,
        })
    }
}

/// One synthetic camera. `drop_every` simulates a flaky device by
/// returning an empty read every nth frame.
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    sequence: u64,
    drop_every: Option<u64>,
}

impl SyntheticSource {
    pub fn with_drop_every(mut self, nth: u64) -> Self {
        self.drop_every = Some(nth);
        self
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        self.sequence += 1;

        if let Some(nth) = self.drop_every {
            if self.sequence % nth == 0 {
                return Ok(None);
            }
        }

        let shade = u8::try_from(self.sequence % 256).unwrap_or_default();
        let len = usize::try_from(u64::from(self.width) * u64::from(self.height))
            .unwrap_or_default();
        let data = Bytes::from(vec![shade; len]);
        Ok(Some(Frame::new(self.width, self.height, data)))
    }
}

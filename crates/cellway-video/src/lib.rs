//! Camera capture channels for the cellway cell coordinator.
//!
//! Each station camera gets one [`VideoChannel`]: a blocking capture
//! worker that runs continuously and resiliently regardless of what the
//! consumers do, publishing decoded [`Frame`]s through a broadcast
//! subscription. The hardware driver plugs in behind the
//! [`CaptureBackend`]/[`FrameSource`] ports; [`SyntheticBackend`]
//! provides a generated test pattern for development and tests.

pub mod channel;
pub mod error;
pub mod frame;
pub mod source;
pub mod synthetic;

pub use channel::{ChannelState, VideoChannel};
pub use error::VideoError;
pub use frame::{CaptureConfig, Frame};
pub use source::{CaptureBackend, FrameSource};
pub use synthetic::{SyntheticBackend, SyntheticSource};

//! Network edge for the cellway cell coordinator.
//!
//! Two surfaces live here: [`bus::BusClient`], the long-lived WebSocket
//! event-bus connection to the cell backend, and [`robot::RobotLink`], the
//! short-lived timeout-bounded HTTP command channel to the AGV.
//! `cellway-core` drives both; nothing in this crate holds domain state.

pub mod bus;
pub mod error;
pub mod robot;
pub mod transport;

pub use bus::{BusClient, Connectivity};
pub use error::Error;
pub use robot::{DEFAULT_COMMAND_TIMEOUT, RobotLink};
pub use transport::TransportConfig;

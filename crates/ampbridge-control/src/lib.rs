//! Typed control operations for networked audio streamers.
//!
//! Sits on top of [`ampbridge_transport`]: every operation here builds a
//! command in the device's vocabulary, sends it through a shared connection,
//! and parses the reply or notification stream into plain Rust values.
//! [`MediaControl`] covers the line-protocol (TCP) firmware,
//! [`StatusControl`] the websocket firmware.

pub mod error;
pub mod media;
pub mod playback;
pub mod status;
pub mod streams;
pub mod version;
pub mod volume;

pub use error::{ControlError, Result};
pub use media::MediaControl;
pub use playback::LoopMode;
pub use status::{DeviceStatus, StatusControl};
pub use streams::TrackMetadata;
pub use version::FirmwareVersion;

//! gaze-shim - Eye gaze shim for tracked devices
//!
//! Wraps a tracked device, listens for OSC eye-orientation telemetry over UDP
//! and republishes it as a combined, normalized gaze direction through the
//! host's eye-tracking input component.
//!
//! ```text
//! UDP :9020 ──▶ OscReceiver ──▶ combine() ──▶ GazePublisher ──▶ DriverHost
//!                    ▲                                             │
//!                    └──────────── EyeGazeShim (lifecycle) ────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod gaze;
pub mod mock;
pub mod shim;
pub mod streaming;

// Re-export commonly used types
pub use config::ShimConfig;
pub use crate::core::device::TrackedDevice;
pub use crate::core::host::DriverHost;
pub use crate::core::types::{DeviceIndex, EyeTrackingData, RawGazeSample};
pub use error::{Error, Result};
pub use gaze::{GazePublisher, combine};
pub use shim::{EyeGazeShim, LifecycleState, ShimOutcome, create_shim};
pub use streaming::OscReceiver;

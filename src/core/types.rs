//! Core data types for gaze samples and the tracked-device boundary.
//!
//! Key types:
//! - [`RawGazeSample`]: Per-eye pitch/yaw angles decoded from one OSC message
//! - [`EyeTrackingData`]: Combined gaze direction pushed to the host
//! - [`DeviceIndex`]: Host-assigned device identifier (invalid outside activation)

use std::fmt;

/// Gaze target used whenever no valid direction is available (straight ahead).
pub const FALLBACK_GAZE_TARGET: [f32; 3] = [0.0, 0.0, -1.0];

/// Raw per-eye angles in degrees, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawGazeSample {
    pub left_pitch: f32,
    pub left_yaw: f32,
    pub right_pitch: f32,
    pub right_yaw: f32,
}

impl RawGazeSample {
    pub fn new(left_pitch: f32, left_yaw: f32, right_pitch: f32, right_yaw: f32) -> Self {
        Self {
            left_pitch,
            left_yaw,
            right_pitch,
            right_yaw,
        }
    }

    /// Same pitch/yaw for both eyes
    pub fn binocular(pitch: f32, yaw: f32) -> Self {
        Self::new(pitch, yaw, pitch, yaw)
    }

    /// True when all four angles are finite (no NaN, no infinity)
    pub fn is_finite(&self) -> bool {
        self.left_pitch.is_finite()
            && self.left_yaw.is_finite()
            && self.right_pitch.is_finite()
            && self.right_yaw.is_finite()
    }
}

/// Combined gaze direction as published to the host's eye-tracking component.
///
/// `tracked` and `active` always mirror `valid`. When `valid` is false the
/// target is [`FALLBACK_GAZE_TARGET`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeTrackingData {
    /// Unit gaze vector in device-local coordinates (-Z forward)
    pub gaze_target: [f32; 3],
    pub valid: bool,
    pub tracked: bool,
    pub active: bool,
}

impl EyeTrackingData {
    /// Valid sample for an already-normalized direction
    pub fn tracked(gaze_target: [f32; 3]) -> Self {
        Self {
            gaze_target,
            valid: true,
            tracked: true,
            active: true,
        }
    }

    /// Invalid sample pointing straight ahead
    pub const fn fallback() -> Self {
        Self {
            gaze_target: FALLBACK_GAZE_TARGET,
            valid: false,
            tracked: false,
            active: false,
        }
    }

    /// Magnitude of the gaze vector
    pub fn magnitude(&self) -> f32 {
        let [x, y, z] = self.gaze_target;
        (x * x + y * y + z * z).sqrt()
    }
}

impl Default for EyeTrackingData {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Host-assigned tracked device index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIndex(pub u32);

impl DeviceIndex {
    /// Sentinel used before activation and after deactivation
    pub const INVALID: DeviceIndex = DeviceIndex(u32::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for DeviceIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// Host property container handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyContainer(pub u64);

/// Handle of an input component created through the host registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputComponentHandle(pub u64);

/// Opaque component returned by a device's `get_component`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHandle(pub u64);

/// Device properties the shim writes to the host registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    /// Advertises XR eye gaze interaction support (bool)
    SupportsXrEyeGazeInteraction,
}

impl DeviceProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupportsXrEyeGazeInteraction => "supports_xr_eye_gaze_interaction",
        }
    }
}

/// Device pose, passed through untouched from the wrapped device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverPose {
    pub position: [f64; 3],
    /// Rotation quaternion (w, x, y, z)
    pub rotation: [f64; 4],
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl Default for DriverPose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
            pose_is_valid: false,
            device_is_connected: false,
        }
    }
}

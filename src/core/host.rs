//! DriverHost trait definition

use crate::core::types::{
    DeviceIndex, DeviceProperty, EyeTrackingData, InputComponentHandle, PropertyContainer,
};
use crate::error::Result;

/// Host runtime property and input registry.
///
/// Shared between the host thread (activation) and the receiver thread
/// (`update_eye_tracking_component`), hence `Send + Sync`.
pub trait DriverHost: Send + Sync {
    /// Whether eye gaze can be advertised for this device at all
    fn supports_eye_gaze(&self) -> bool;

    /// Resolve the property container of an activated device
    fn property_container(&self, index: DeviceIndex) -> PropertyContainer;

    /// Set a boolean property on a device's property container
    fn set_bool_property(
        &self,
        container: PropertyContainer,
        property: DeviceProperty,
        value: bool,
    ) -> Result<()>;

    /// Create the eye-tracking input component bound to `path`
    fn create_eye_tracking_component(
        &self,
        container: PropertyContainer,
        path: &str,
    ) -> Result<InputComponentHandle>;

    /// Push a new gaze sample to an eye-tracking component
    fn update_eye_tracking_component(
        &self,
        handle: InputComponentHandle,
        data: &EyeTrackingData,
        time_offset_s: f64,
    );
}

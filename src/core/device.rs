//! TrackedDevice trait definition

use crate::core::types::{ComponentHandle, DeviceIndex, DriverPose};
use crate::error::Result;

/// Tracked device driver as seen by the host runtime.
///
/// The shim implements this trait itself and holds the device it wraps,
/// forwarding every call and augmenting only `activate` and `deactivate`.
pub trait TrackedDevice: Send {
    /// Called by the host once it has assigned a device index
    fn activate(&mut self, index: DeviceIndex) -> Result<()>;

    /// Called by the host when the device goes away
    fn deactivate(&mut self);

    /// Device should enter a low-power state
    fn enter_standby(&mut self);

    /// Look up a driver component by name and version string
    fn get_component(&mut self, name_and_version: &str) -> Option<ComponentHandle>;

    /// Current pose of the device
    fn get_pose(&self) -> DriverPose;

    /// Free-form debug request; returns the response text
    fn debug_request(&mut self, request: &str) -> String;
}

impl<T: TrackedDevice + ?Sized> TrackedDevice for Box<T> {
    fn activate(&mut self, index: DeviceIndex) -> Result<()> {
        (**self).activate(index)
    }

    fn deactivate(&mut self) {
        (**self).deactivate()
    }

    fn enter_standby(&mut self) {
        (**self).enter_standby()
    }

    fn get_component(&mut self, name_and_version: &str) -> Option<ComponentHandle> {
        (**self).get_component(name_and_version)
    }

    fn get_pose(&self) -> DriverPose {
        (**self).get_pose()
    }

    fn debug_request(&mut self, request: &str) -> String {
        (**self).debug_request(request)
    }
}

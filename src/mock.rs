//! In-process host and device doubles
//!
//! [`RecordingHost`] records every registry call and published gaze sample.
//! [`MockDevice`] counts lifecycle calls and serves a fixed pose. Both are
//! cheap clones over shared state, so a test can keep a handle after moving
//! one into the shim. The `gaze-shim` binary uses them to run the shim
//! without a host runtime.

use crate::core::device::TrackedDevice;
use crate::core::host::DriverHost;
use crate::core::types::{
    ComponentHandle, DeviceIndex, DeviceProperty, DriverPose, EyeTrackingData,
    InputComponentHandle, PropertyContainer,
};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Offset between device index and property container handle
const CONTAINER_BASE: u64 = 0x1000;

/// Recorded gaze updates kept; older ones are dropped (counts keep going)
const MAX_RECORDED_UPDATES: usize = 4096;

/// Host registry double
#[derive(Clone)]
pub struct RecordingHost {
    inner: Arc<HostShared>,
}

struct HostShared {
    state: Mutex<HostState>,
    updated: Condvar,
}

#[derive(Default)]
struct HostState {
    supports_eye_gaze: bool,
    fail_component_creation: bool,
    bool_properties: Vec<(PropertyContainer, DeviceProperty, bool)>,
    components: Vec<(PropertyContainer, String, InputComponentHandle)>,
    updates: VecDeque<(InputComponentHandle, EyeTrackingData)>,
    total_updates: usize,
    next_handle: u64,
}

impl RecordingHost {
    /// Host that supports eye gaze
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HostShared {
                state: Mutex::new(HostState {
                    supports_eye_gaze: true,
                    next_handle: 1,
                    ..HostState::default()
                }),
                updated: Condvar::new(),
            }),
        }
    }

    /// Host without eye gaze capability
    pub fn without_eye_gaze() -> Self {
        let host = Self::new();
        host.inner.state.lock().supports_eye_gaze = false;
        host
    }

    /// Make `create_eye_tracking_component` fail
    pub fn fail_component_creation(&self) {
        self.inner.state.lock().fail_component_creation = true;
    }

    pub fn bool_properties(&self) -> Vec<(PropertyContainer, DeviceProperty, bool)> {
        self.inner.state.lock().bool_properties.clone()
    }

    pub fn components(&self) -> Vec<(PropertyContainer, String, InputComponentHandle)> {
        self.inner.state.lock().components.clone()
    }

    /// Most recent updates, oldest first
    pub fn updates(&self) -> Vec<(InputComponentHandle, EyeTrackingData)> {
        self.inner.state.lock().updates.iter().copied().collect()
    }

    /// Total updates pushed since creation
    pub fn update_count(&self) -> usize {
        self.inner.state.lock().total_updates
    }

    pub fn latest_update(&self) -> Option<EyeTrackingData> {
        self.inner.state.lock().updates.back().map(|(_, data)| *data)
    }

    /// Block until at least `count` updates were pushed or `timeout` expires
    pub fn wait_for_updates(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while state.total_updates < count {
            if self
                .inner
                .updated
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.total_updates >= count;
            }
        }
        true
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverHost for RecordingHost {
    fn supports_eye_gaze(&self) -> bool {
        self.inner.state.lock().supports_eye_gaze
    }

    fn property_container(&self, index: DeviceIndex) -> PropertyContainer {
        PropertyContainer(CONTAINER_BASE + u64::from(index.0))
    }

    fn set_bool_property(
        &self,
        container: PropertyContainer,
        property: DeviceProperty,
        value: bool,
    ) -> Result<()> {
        log::debug!("Property {} = {} on {:?}", property.as_str(), value, container);
        self.inner
            .state
            .lock()
            .bool_properties
            .push((container, property, value));
        Ok(())
    }

    fn create_eye_tracking_component(
        &self,
        container: PropertyContainer,
        path: &str,
    ) -> Result<InputComponentHandle> {
        let mut state = self.inner.state.lock();
        if state.fail_component_creation {
            return Err(Error::Host(format!("Cannot create component {}", path)));
        }
        let handle = InputComponentHandle(state.next_handle);
        state.next_handle += 1;
        state.components.push((container, path.to_string(), handle));
        Ok(handle)
    }

    fn update_eye_tracking_component(
        &self,
        handle: InputComponentHandle,
        data: &EyeTrackingData,
        _time_offset_s: f64,
    ) {
        log::trace!("Eye tracking update on {:?}: {:?}", handle, data);
        let mut state = self.inner.state.lock();
        if state.updates.len() == MAX_RECORDED_UPDATES {
            state.updates.pop_front();
        }
        state.updates.push_back((handle, *data));
        state.total_updates += 1;
        drop(state);
        self.inner.updated.notify_all();
    }
}

/// Tracked device double
#[derive(Clone, Default)]
pub struct MockDevice {
    inner: Arc<Mutex<DeviceState>>,
}

#[derive(Default)]
struct DeviceState {
    fail_activation: bool,
    activations: Vec<DeviceIndex>,
    deactivations: usize,
    standby_requests: usize,
    pose: DriverPose,
    debug_requests: Vec<String>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that reports `pose` from `get_pose`
    pub fn with_pose(pose: DriverPose) -> Self {
        let device = Self::new();
        device.inner.lock().pose = pose;
        device
    }

    /// Make `activate` fail
    pub fn fail_activation(&self) {
        self.inner.lock().fail_activation = true;
    }

    pub fn activations(&self) -> Vec<DeviceIndex> {
        self.inner.lock().activations.clone()
    }

    pub fn deactivations(&self) -> usize {
        self.inner.lock().deactivations
    }

    pub fn standby_requests(&self) -> usize {
        self.inner.lock().standby_requests
    }

    pub fn debug_requests(&self) -> Vec<String> {
        self.inner.lock().debug_requests.clone()
    }
}

impl TrackedDevice for MockDevice {
    fn activate(&mut self, index: DeviceIndex) -> Result<()> {
        let mut state = self.inner.lock();
        if state.fail_activation {
            return Err(Error::Device(format!("Activation of {} refused", index)));
        }
        state.activations.push(index);
        Ok(())
    }

    fn deactivate(&mut self) {
        self.inner.lock().deactivations += 1;
    }

    fn enter_standby(&mut self) {
        self.inner.lock().standby_requests += 1;
    }

    fn get_component(&mut self, name_and_version: &str) -> Option<ComponentHandle> {
        name_and_version
            .starts_with("IVRDisplayComponent")
            .then_some(ComponentHandle(1))
    }

    fn get_pose(&self) -> DriverPose {
        self.inner.lock().pose
    }

    fn debug_request(&mut self, request: &str) -> String {
        self.inner.lock().debug_requests.push(request.to_string());
        format!("mock: {}", request)
    }
}

//! Eye gaze shim - lifecycle controller wrapping a tracked device.
//!
//! [`EyeGazeShim`] owns the device it wraps and implements [`TrackedDevice`]
//! itself. Every call is forwarded; only activation and deactivation are
//! augmented.
//!
//! # Lifecycle
//!
//! ```text
//! ┌─────────┐  activate(index)   ┌───────────┐  deactivate()  ┌─────────────┐
//! │ Created │ ─────────────────▶ │ Activated │ ─────────────▶ │ Deactivated │
//! └─────────┘                    └───────────┘                └─────────────┘
//!      ▲        activation error      │                       (terminal, repeat
//!      └──────────────────────────────┘                        deactivate is a no-op)
//! ```
//!
//! ## Activation order
//!
//! 1. Forward `activate` to the wrapped device
//! 2. Record the device index, resolve its property container
//! 3. Advertise `SupportsXrEyeGazeInteraction`
//! 4. Create the eye-tracking input component at `/eyetracking`
//! 5. Bind the OSC socket and start the receiver thread
//!
//! If steps 2-5 fail, the wrapped device is deactivated again, the index is
//! invalidated and the error is returned. The shim stays `Created`.
//!
//! ## Deactivation order
//!
//! 1. Stop the receiver (atomic swap guard) and join its thread
//! 2. Drop the socket, invalidate the device index
//! 3. Forward `deactivate` to the wrapped device
//!
//! # Capability Check
//!
//! [`create_shim`] asks the host whether eye gaze is supported. If not, the
//! device is handed back untouched as [`ShimOutcome::Passthrough`].

use crate::config::ShimConfig;
use crate::core::device::TrackedDevice;
use crate::core::host::DriverHost;
use crate::core::types::{
    ComponentHandle, DeviceIndex, DeviceProperty, DriverPose, EyeTrackingData,
    InputComponentHandle,
};
use crate::error::{Error, Result};
use crate::gaze::{GazePublisher, combine};
use crate::streaming::OscReceiver;
use std::net::SocketAddr;
use std::sync::Arc;

/// Lifecycle state of an [`EyeGazeShim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no device index yet
    Created,
    /// Device activated, receiver running
    Activated,
    /// Deactivated; terminal
    Deactivated,
}

/// Result of [`create_shim`]
pub enum ShimOutcome<D> {
    /// Eye gaze supported: the device is wrapped
    Shimmed(EyeGazeShim<D>),
    /// Eye gaze unsupported: the original device, untouched
    Passthrough(D),
}

impl<D: TrackedDevice + 'static> ShimOutcome<D> {
    pub fn is_shimmed(&self) -> bool {
        matches!(self, Self::Shimmed(_))
    }

    /// Device to hand to the host, whichever branch was taken
    pub fn into_device(self) -> Box<dyn TrackedDevice> {
        match self {
            Self::Shimmed(shim) => Box::new(shim),
            Self::Passthrough(device) => Box::new(device),
        }
    }
}

/// Wrap `device` with eye gaze support if the host can advertise it
pub fn create_shim<D: TrackedDevice>(
    device: D,
    host: Arc<dyn DriverHost>,
    config: ShimConfig,
) -> ShimOutcome<D> {
    if !host.supports_eye_gaze() {
        log::info!("Eye gaze not supported by host, device left unshimmed");
        return ShimOutcome::Passthrough(device);
    }

    log::debug!("Wrapping device with eye gaze shim");
    ShimOutcome::Shimmed(EyeGazeShim::new(device, host, config))
}

/// Tracked device wrapper publishing OSC gaze telemetry
pub struct EyeGazeShim<D> {
    device: D,
    host: Arc<dyn DriverHost>,
    config: ShimConfig,
    state: LifecycleState,
    device_index: DeviceIndex,
    publisher: Option<Arc<GazePublisher>>,
    /// `Some` only while activated
    receiver: Option<OscReceiver>,
}

impl<D: TrackedDevice> EyeGazeShim<D> {
    fn new(device: D, host: Arc<dyn DriverHost>, config: ShimConfig) -> Self {
        Self {
            device,
            host,
            config,
            state: LifecycleState::Created,
            device_index: DeviceIndex::INVALID,
            publisher: None,
            receiver: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn device_index(&self) -> DeviceIndex {
        self.device_index
    }

    /// Whether the receiver thread is running
    pub fn is_active(&self) -> bool {
        self.receiver.as_ref().is_some_and(OscReceiver::is_running)
    }

    /// Address the OSC receiver is bound to, while activated
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().map(OscReceiver::local_addr)
    }

    /// Eye-tracking component created at activation
    pub fn eye_tracking_component(&self) -> Option<InputComponentHandle> {
        self.publisher.as_ref().map(|p| p.component())
    }

    /// Last published gaze sample (fallback if none yet)
    pub fn latest_gaze(&self) -> EyeTrackingData {
        self.publisher
            .as_ref()
            .map(|p| p.latest())
            .unwrap_or_default()
    }

    /// Wrapped device
    pub fn inner(&self) -> &D {
        &self.device
    }

    fn start_eye_tracking(&mut self) -> Result<()> {
        let container = self.host.property_container(self.device_index);

        self.host.set_bool_property(
            container,
            DeviceProperty::SupportsXrEyeGazeInteraction,
            true,
        )?;

        let component = self
            .host
            .create_eye_tracking_component(container, &self.config.input.component_path)?;
        log::info!(
            "Eye gaze component {:?} at {}",
            component,
            self.config.input.component_path
        );

        let publisher = Arc::new(GazePublisher::new(Arc::clone(&self.host), component));
        self.publisher = Some(Arc::clone(&publisher));

        let mut receiver = OscReceiver::bind(&self.config.listener)?;
        receiver.start(move |sample| publisher.update(combine(&sample)))?;
        self.receiver = Some(receiver);

        Ok(())
    }
}

impl<D: TrackedDevice> TrackedDevice for EyeGazeShim<D> {
    fn activate(&mut self, index: DeviceIndex) -> Result<()> {
        if self.state != LifecycleState::Created {
            return Err(Error::InvalidState(format!(
                "activate({}) called in state {:?}",
                index, self.state
            )));
        }

        log::info!("Activating eye gaze shim for device {}", index);
        self.device.activate(index)?;
        self.device_index = index;

        if let Err(e) = self.start_eye_tracking() {
            log::error!("Eye gaze activation failed for device {}: {}", index, e);
            self.receiver = None;
            self.publisher = None;
            self.device_index = DeviceIndex::INVALID;
            self.device.deactivate();
            return Err(e);
        }

        self.state = LifecycleState::Activated;
        Ok(())
    }

    fn deactivate(&mut self) {
        log::debug!("Deactivating eye gaze shim for device {}", self.device_index);

        if let Some(mut receiver) = self.receiver.take() {
            match receiver.stop() {
                Ok(true) => log::debug!("OSC receiver joined"),
                Ok(false) => {}
                Err(e) => log::error!("Failed to stop OSC receiver: {}", e),
            }
        }

        self.device_index = DeviceIndex::INVALID;
        self.device.deactivate();
        self.state = LifecycleState::Deactivated;

        log::info!("Deactivated device shimmed with eye gaze shim");
    }

    fn enter_standby(&mut self) {
        self.device.enter_standby()
    }

    fn get_component(&mut self, name_and_version: &str) -> Option<ComponentHandle> {
        self.device.get_component(name_and_version)
    }

    fn get_pose(&self) -> DriverPose {
        self.device.get_pose()
    }

    fn debug_request(&mut self, request: &str) -> String {
        self.device.debug_request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListenerConfig;
    use crate::mock::{MockDevice, RecordingHost};

    fn loopback_config() -> ShimConfig {
        ShimConfig {
            listener: ListenerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                ..ListenerConfig::default()
            },
            ..ShimConfig::default()
        }
    }

    fn shimmed(device: MockDevice, host: &RecordingHost) -> EyeGazeShim<MockDevice> {
        match create_shim(device, Arc::new(host.clone()), loopback_config()) {
            ShimOutcome::Shimmed(shim) => shim,
            ShimOutcome::Passthrough(_) => panic!("expected shimmed device"),
        }
    }

    #[test]
    fn test_passthrough_without_capability() {
        let host = RecordingHost::without_eye_gaze();
        let device = MockDevice::new();
        let outcome = create_shim(device.clone(), Arc::new(host.clone()), loopback_config());
        assert!(!outcome.is_shimmed());

        let mut device_out = outcome.into_device();
        device_out.activate(DeviceIndex(2)).unwrap();
        device_out.deactivate();

        assert_eq!(device.activations(), vec![DeviceIndex(2)]);
        assert_eq!(device.deactivations(), 1);
        assert!(host.bool_properties().is_empty());
        assert!(host.components().is_empty());
    }

    #[test]
    fn test_activation_registers_capability() {
        let host = RecordingHost::new();
        let device = MockDevice::new();
        let mut shim = shimmed(device.clone(), &host);
        assert_eq!(shim.state(), LifecycleState::Created);
        assert!(!shim.device_index().is_valid());

        shim.activate(DeviceIndex(1)).unwrap();
        assert_eq!(shim.state(), LifecycleState::Activated);
        assert_eq!(shim.device_index(), DeviceIndex(1));
        assert!(shim.is_active());
        assert!(shim.listen_addr().is_some());
        assert_eq!(device.activations(), vec![DeviceIndex(1)]);

        let container = host.property_container(DeviceIndex(1));
        assert_eq!(
            host.bool_properties(),
            vec![(container, DeviceProperty::SupportsXrEyeGazeInteraction, true)]
        );
        let components = host.components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].1, "/eyetracking");
        assert_eq!(shim.eye_tracking_component(), Some(components[0].2));

        shim.deactivate();
    }

    #[test]
    fn test_deactivate_twice() {
        let host = RecordingHost::new();
        let device = MockDevice::new();
        let mut shim = shimmed(device.clone(), &host);

        shim.activate(DeviceIndex(0)).unwrap();
        shim.deactivate();
        assert!(!shim.is_active());
        assert_eq!(shim.state(), LifecycleState::Deactivated);
        assert!(!shim.device_index().is_valid());

        shim.deactivate();
        assert_eq!(shim.state(), LifecycleState::Deactivated);
        assert_eq!(device.deactivations(), 2);
    }

    #[test]
    fn test_reentrant_activation_rejected() {
        let host = RecordingHost::new();
        let device = MockDevice::new();
        let mut shim = shimmed(device.clone(), &host);

        shim.activate(DeviceIndex(0)).unwrap();
        assert!(matches!(
            shim.activate(DeviceIndex(1)),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(shim.device_index(), DeviceIndex(0));

        shim.deactivate();
        assert!(matches!(
            shim.activate(DeviceIndex(0)),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(device.activations().len(), 1);
    }

    #[test]
    fn test_device_activation_failure_propagates() {
        let host = RecordingHost::new();
        let device = MockDevice::new();
        device.fail_activation();
        let mut shim = shimmed(device.clone(), &host);

        assert!(matches!(shim.activate(DeviceIndex(0)), Err(Error::Device(_))));
        assert_eq!(shim.state(), LifecycleState::Created);
        assert!(host.components().is_empty());
        assert!(!shim.is_active());
    }

    #[test]
    fn test_component_failure_rolls_back() {
        let host = RecordingHost::new();
        host.fail_component_creation();
        let device = MockDevice::new();
        let mut shim = shimmed(device.clone(), &host);

        assert!(matches!(shim.activate(DeviceIndex(4)), Err(Error::Host(_))));
        assert_eq!(shim.state(), LifecycleState::Created);
        assert!(!shim.device_index().is_valid());
        assert!(shim.listen_addr().is_none());
        assert_eq!(device.deactivations(), 1);
    }

    #[test]
    fn test_passthrough_calls() {
        let pose = DriverPose {
            position: [0.1, 1.6, -0.2],
            pose_is_valid: true,
            device_is_connected: true,
            ..DriverPose::default()
        };
        let host = RecordingHost::new();
        let device = MockDevice::with_pose(pose);
        let mut shim = shimmed(device.clone(), &host);

        shim.enter_standby();
        assert_eq!(shim.inner().standby_requests(), 1);
        assert_eq!(shim.get_pose(), pose);
        assert_eq!(
            shim.get_component("IVRDisplayComponent_003"),
            Some(ComponentHandle(1))
        );
        assert_eq!(shim.get_component("IVRCameraComponent_003"), None);
        assert_eq!(shim.debug_request("ping"), "mock: ping");
        assert_eq!(device.debug_requests(), vec!["ping".to_string()]);

        // Pass-through never touches the registry
        assert!(host.bool_properties().is_empty());
        assert_eq!(host.update_count(), 0);
    }

    #[test]
    fn test_latest_gaze_before_activation() {
        let host = RecordingHost::new();
        let shim = shimmed(MockDevice::new(), &host);
        assert_eq!(shim.latest_gaze(), EyeTrackingData::fallback());
        assert!(shim.eye_tracking_component().is_none());
    }
}

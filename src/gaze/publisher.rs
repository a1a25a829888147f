//! Published gaze state
//!
//! Holds the last gaze sample and pushes every update to the host's
//! eye-tracking input component at the moment it is computed.
//!
//! There is a single writer (the OSC receiver thread). Readers on other
//! threads see either the previous or the new value, never a mix: the held
//! value is replaced as one copy under a short lock.

use crate::core::host::DriverHost;
use crate::core::types::{EyeTrackingData, InputComponentHandle};
use parking_lot::Mutex;
use std::sync::Arc;

/// Pushes combined gaze samples to one host input component
pub struct GazePublisher {
    host: Arc<dyn DriverHost>,
    component: InputComponentHandle,
    latest: Mutex<EyeTrackingData>,
}

impl GazePublisher {
    pub fn new(host: Arc<dyn DriverHost>, component: InputComponentHandle) -> Self {
        Self {
            host,
            component,
            latest: Mutex::new(EyeTrackingData::fallback()),
        }
    }

    /// Replace the held sample and push it to the host
    pub fn update(&self, data: EyeTrackingData) {
        *self.latest.lock() = data;
        self.host
            .update_eye_tracking_component(self.component, &data, 0.0);
    }

    /// Last published sample (fallback before the first update)
    pub fn latest(&self) -> EyeTrackingData {
        *self.latest.lock()
    }

    pub fn component(&self) -> InputComponentHandle {
        self.component
    }
}

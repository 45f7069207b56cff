use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use mictap_foundation::CaptureError;

/// Thin wrapper around the platform audio host for device discovery.
pub struct DeviceManager {
    host: Host,
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host.id()
    }

    /// The OS default capture device.
    pub fn default_input_device(&self) -> Result<Device, CaptureError> {
        self.host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotFound { name: None })
    }

    /// Names of every enumerable input device, for diagnostics logging.
    pub fn input_device_names(&self) -> Vec<String> {
        self.host
            .input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

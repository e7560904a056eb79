//! Device registry port: the managed registry edge devices authenticate
//! against and receive configs and commands through.

use std::future::Future;
use std::sync::Arc;

use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::registry::{NewRegistryDevice, RegistryDevice};

/// Operations on the IoT device registry.
///
/// Payloads are raw bytes; encoding them for transport is the adapter's job.
pub trait DeviceRegistry {
    /// Ids of every registered device.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<String>, CropCloudError>> + Send;

    /// Full details of one device.
    fn get_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<RegistryDevice, CropCloudError>> + Send;

    fn delete_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send;

    /// Version of the most recent config, `None` if none was ever sent.
    fn latest_config_version(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Option<u64>, CropCloudError>> + Send;

    /// Replace the device config. Only the latest version can be updated.
    fn modify_config(
        &self,
        device_id: &str,
        version_to_update: u64,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send;

    /// Send a one-shot command on a subfolder.
    fn send_command(
        &self,
        device_id: &str,
        subfolder: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send;

    fn create_device(
        &self,
        device: NewRegistryDevice,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send;
}

impl<T: DeviceRegistry + Send + Sync> DeviceRegistry for Arc<T> {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<String>, CropCloudError>> + Send {
        (**self).list_devices()
    }

    fn get_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<RegistryDevice, CropCloudError>> + Send {
        (**self).get_device(device_id)
    }

    fn delete_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).delete_device(device_id)
    }

    fn latest_config_version(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<Option<u64>, CropCloudError>> + Send {
        (**self).latest_config_version(device_id)
    }

    fn modify_config(
        &self,
        device_id: &str,
        version_to_update: u64,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).modify_config(device_id, version_to_update, data)
    }

    fn send_command(
        &self,
        device_id: &str,
        subfolder: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).send_command(device_id, subfolder, data)
    }

    fn create_device(
        &self,
        device: NewRegistryDevice,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).create_device(device)
    }
}

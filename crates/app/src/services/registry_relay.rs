//! Registry relay: device listing, config pushes, commands and registration
//! against the IoT device registry.

use std::collections::BTreeMap;

use serde_json::Value;

use cropcloud_domain::directory::DeviceList;
use cropcloud_domain::error::{CropCloudError, NotFoundError};
use cropcloud_domain::registry::{
    DEFAULT_CONFIG_VERSION, DeviceConfig, NewRegistryDevice, PublicKeyRecord, RegistrationCount,
    RegistryDeviceSummary, START_RECIPE_SUBFOLDER, StartRecipeCommand, VERIFIED_STATE,
    format_count,
};
use cropcloud_domain::shard::kind;
use cropcloud_domain::time::format_timestamp;

use crate::ports::{Clock, DeviceRegistry, EntityStore, Query};

/// Outcome of a successful registration: the new registry id and the
/// software version the device reported, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub device_id: String,
    pub software_version: Option<String>,
}

/// Owner and labels stored as registry metadata for a new device.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest<'a> {
    pub verification_code: &'a str,
    pub device_name: &'a str,
    pub device_notes: &'a str,
    pub device_type: &'a str,
    pub user_uuid: &'a str,
}

pub struct RegistryRelay<R, S, C> {
    registry: R,
    store: S,
    clock: C,
}

fn to_bytes<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CropCloudError> {
    serde_json::to_vec(value).map_err(|err| CropCloudError::Remote(Box::new(err)))
}

impl<R, S, C> RegistryRelay<R, S, C>
where
    R: DeviceRegistry,
    S: EntityStore,
    C: Clock,
{
    pub fn new(registry: R, store: S, clock: C) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    fn stamp(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Number of registered devices, `None` when the registry is unreachable.
    pub async fn registration_count(&self) -> Option<RegistrationCount> {
        match self.registry.list_devices().await {
            Ok(ids) => Some(RegistrationCount {
                registered: format_count(ids.len()),
                timestamp: self.stamp(),
            }),
            Err(err) => {
                tracing::error!(error = %err, "failed to list registry devices");
                None
            }
        }
    }

    /// Every registered device with heartbeat, error and owner details.
    pub async fn device_list(&self) -> Option<DeviceList<RegistryDeviceSummary>> {
        let ids = match self.registry.list_devices().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "failed to list registry devices");
                return None;
            }
        };
        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            match self.registry.get_device(&id).await {
                Ok(device) => devices.push(RegistryDeviceSummary::from(device)),
                Err(err) => {
                    tracing::error!(error = %err, device_id = %id, "failed to fetch registry device");
                    return None;
                }
            }
        }
        Some(DeviceList {
            devices,
            timestamp: self.stamp(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_device(&self, device_id: &str) -> bool {
        match self.registry.delete_device(device_id).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to delete registry device");
                false
            }
        }
    }

    /// Replace the device config with `commands`, updating the latest
    /// config version.
    ///
    /// # Errors
    ///
    /// Returns the registry error when the version lookup or update fails.
    #[tracing::instrument(skip(self, commands))]
    pub async fn send_recipe_config(&self, device_id: &str, commands: Value) -> Result<(), CropCloudError> {
        let version = self
            .registry
            .latest_config_version(device_id)
            .await?
            .unwrap_or(DEFAULT_CONFIG_VERSION);
        let config = DeviceConfig {
            last_config_version: version.to_string(),
            message_id: self.clock.now().timestamp().to_string(),
            device_id: device_id.to_string(),
            commands,
        };
        tracing::info!(version, "sending config to device");
        self.registry
            .modify_config(device_id, version, to_bytes(&config)?)
            .await
    }

    /// Tell the device to start a recipe, optionally shipping the recipe.
    ///
    /// # Errors
    ///
    /// Returns the registry error, whose message says why the device could
    /// not be reached.
    #[tracing::instrument(skip(self, recipe))]
    pub async fn send_start_recipe(
        &self,
        device_id: &str,
        recipe_uuid: &str,
        recipe: Option<Value>,
    ) -> Result<(), CropCloudError> {
        let command = StartRecipeCommand {
            recipe_uuid: recipe_uuid.to_string(),
            recipe_dict: recipe,
        };
        self.registry
            .send_command(device_id, START_RECIPE_SUBFOLDER, to_bytes(&command)?)
            .await
    }

    /// Register the device whose setup script uploaded a public key under
    /// `verification_code`, then mark that key as verified.
    ///
    /// # Errors
    ///
    /// - [`CropCloudError::NotFound`] when no key carries the code.
    /// - [`CropCloudError::Validation`] when the key record is incomplete.
    /// - The store or registry error when either call fails.
    #[tracing::instrument(skip(self, request), fields(code = %request.verification_code))]
    pub async fn create_registry_entry(
        &self,
        request: RegistrationRequest<'_>,
    ) -> Result<Registration, CropCloudError> {
        let query = Query::new(kind::DEVICE_PUBLIC_KEYS)
            .filter("cksum", request.verification_code)
            .limit(Some(1));
        let mut entity = self
            .store
            .query(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NotFoundError {
                entity: "Verification code",
                id: request.verification_code.to_string(),
            })?;
        let record = PublicKeyRecord::from_properties(&entity.properties)?;
        let device_id = record.device_id(request.device_type, request.verification_code);

        let metadata = BTreeMap::from([
            ("user_uuid".to_string(), request.user_uuid.to_string()),
            ("device_name".to_string(), request.device_name.to_string()),
            ("device_notes".to_string(), request.device_notes.to_string()),
        ]);
        self.registry
            .create_device(NewRegistryDevice {
                id: device_id.clone(),
                public_key: record.key,
                metadata,
            })
            .await?;
        tracing::info!(%device_id, "device added to registry");

        entity
            .properties
            .insert("state".to_string(), Value::String(VERIFIED_STATE.to_string()));
        self.store.put(entity).await?;

        Ok(Registration {
            device_id,
            software_version: record.version,
        })
    }
}

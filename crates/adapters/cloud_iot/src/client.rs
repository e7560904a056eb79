//! [`DeviceRegistry`] over the Cloud IoT REST API.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use cropcloud_app::ports::DeviceRegistry;
use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::registry::{NewRegistryDevice, RegistryDevice};

use crate::config::CloudIotConfig;
use crate::error::RegistryError;
use crate::wire::{
    ApiErrorBody, ConfigVersions, CreateDeviceRequest, DeviceListPage, DeviceResource,
    ModifyConfigRequest, SendCommandRequest, encode_payload,
};

const DEVICE_FIELDS: &str = "lastHeartbeatTime,lastConfigSendTime,lastErrorTime,lastErrorStatus,metadata";

#[derive(Clone)]
pub struct CloudIotRegistry {
    client: reqwest::Client,
    config: CloudIotConfig,
}

/// Turn a refused call into [`RegistryError::Api`] carrying the API's message.
async fn check(response: Response) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| body.error.message)
        .unwrap_or(text);
    Err(RegistryError::Api {
        status: status.as_u16(),
        message,
    })
}

impl CloudIotRegistry {
    /// # Errors
    ///
    /// Returns [`RegistryError::Http`] when the HTTP client cannot be built.
    pub fn new(config: CloudIotConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistryError> {
        check(self.authorized(request).send().await?).await
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RegistryError> {
        Ok(self.send(request).await?.json().await?)
    }

    async fn list_ids(&self) -> Result<Vec<String>, RegistryError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.client.get(self.config.devices_url());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: DeviceListPage = self.fetch(request).await?;
            ids.extend(page.devices.into_iter().map(|device| device.id));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(ids),
            }
        }
    }
}

impl DeviceRegistry for CloudIotRegistry {
    async fn list_devices(&self) -> Result<Vec<String>, CropCloudError> {
        Ok(self.list_ids().await?)
    }

    async fn get_device(&self, device_id: &str) -> Result<RegistryDevice, CropCloudError> {
        let request = self
            .client
            .get(self.config.device_url(device_id))
            .query(&[("fieldMask", DEVICE_FIELDS)]);
        let resource: DeviceResource = self
            .fetch(request)
            .await
            .map_err(|err| err.into_domain(device_id))?;
        Ok(resource.into())
    }

    async fn delete_device(&self, device_id: &str) -> Result<(), CropCloudError> {
        let request = self.client.delete(self.config.device_url(device_id));
        self.send(request)
            .await
            .map_err(|err| err.into_domain(device_id))?;
        Ok(())
    }

    async fn latest_config_version(&self, device_id: &str) -> Result<Option<u64>, CropCloudError> {
        let url = format!("{}/configVersions", self.config.device_url(device_id));
        let versions: ConfigVersions = self
            .fetch(self.client.get(url))
            .await
            .map_err(|err| err.into_domain(device_id))?;
        Ok(versions.latest())
    }

    async fn modify_config(
        &self,
        device_id: &str,
        version_to_update: u64,
        data: Vec<u8>,
    ) -> Result<(), CropCloudError> {
        let url = format!("{}:modifyCloudToDeviceConfig", self.config.device_url(device_id));
        let body = ModifyConfigRequest {
            version_to_update: version_to_update.to_string(),
            binary_data: encode_payload(&data),
        };
        self.send(self.client.post(url).json(&body))
            .await
            .map_err(|err| err.into_domain(device_id))?;
        tracing::debug!(%device_id, version_to_update, "modified device config");
        Ok(())
    }

    async fn send_command(
        &self,
        device_id: &str,
        subfolder: &str,
        data: Vec<u8>,
    ) -> Result<(), CropCloudError> {
        let url = format!("{}:sendCommandToDevice", self.config.device_url(device_id));
        let body = SendCommandRequest {
            binary_data: encode_payload(&data),
            subfolder: subfolder.to_string(),
        };
        self.send(self.client.post(url).json(&body))
            .await
            .map_err(|err| err.into_domain(device_id))?;
        Ok(())
    }

    async fn create_device(&self, device: NewRegistryDevice) -> Result<(), CropCloudError> {
        let body = CreateDeviceRequest::from(device);
        self.send(self.client.post(self.config.devices_url()).json(&body))
            .await?;
        Ok(())
    }
}

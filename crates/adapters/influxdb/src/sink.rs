//! [`TimeSeriesSink`] over the `InfluxDB` HTTP API.

use cropcloud_app::ports::TimeSeriesSink;
use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::timeseries::Point;

use crate::config::InfluxConfig;
use crate::error::InfluxError;
use crate::line_protocol::encode_points;

#[derive(Clone)]
pub struct InfluxSink {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxSink {
    /// # Errors
    ///
    /// Returns [`InfluxError::Http`] when the HTTP client cannot be built.
    pub fn new(config: InfluxConfig) -> Result<Self, InfluxError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    async fn write(&self, body: String) -> Result<(), InfluxError> {
        let mut request = self
            .client
            .post(self.config.write_url())
            .query(&[("db", self.config.database.as_str()), ("precision", "s")])
            .body(body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(InfluxError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl TimeSeriesSink for InfluxSink {
    async fn write_points(&self, points: Vec<Point>) -> Result<(), CropCloudError> {
        let body = encode_points(&points);
        if body.is_empty() {
            tracing::debug!("no writable points");
            return Ok(());
        }
        self.write(body).await?;
        tracing::debug!(points = points.len(), "wrote points to InfluxDB");
        Ok(())
    }
}

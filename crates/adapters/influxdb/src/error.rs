//! `InfluxDB` adapter error types.

use cropcloud_domain::error::CropCloudError;

#[derive(Debug, thiserror::Error)]
pub enum InfluxError {
    /// The request could not be sent or the response not read.
    #[error("InfluxDB request failed")]
    Http(#[from] reqwest::Error),

    /// The server refused the write.
    #[error("InfluxDB rejected the write with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<InfluxError> for CropCloudError {
    fn from(err: InfluxError) -> Self {
        Self::Remote(Box::new(err))
    }
}

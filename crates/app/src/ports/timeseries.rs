//! Time-series port: where inbound telemetry is republished.

use std::future::Future;
use std::sync::Arc;

use cropcloud_domain::error::CropCloudError;
use cropcloud_domain::timeseries::Point;

/// Sink for measurement [`Point`]s.
pub trait TimeSeriesSink {
    /// Write a batch of points.
    fn write_points(
        &self,
        points: Vec<Point>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send;
}

impl<T: TimeSeriesSink + Send + Sync> TimeSeriesSink for Arc<T> {
    fn write_points(
        &self,
        points: Vec<Point>,
    ) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).write_points(points)
    }
}

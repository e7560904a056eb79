//! Analytics port: append-only rows for historical analysis.

use std::future::Future;
use std::sync::Arc;

use cropcloud_domain::analytics::AnalyticsRow;
use cropcloud_domain::error::CropCloudError;

/// Write-only sink for [`AnalyticsRow`]s.
pub trait AnalyticsSink {
    /// Append one row.
    fn insert(&self, row: AnalyticsRow) -> impl Future<Output = Result<(), CropCloudError>> + Send;
}

impl<T: AnalyticsSink + Send + Sync> AnalyticsSink for Arc<T> {
    fn insert(&self, row: AnalyticsRow) -> impl Future<Output = Result<(), CropCloudError>> + Send {
        (**self).insert(row)
    }
}

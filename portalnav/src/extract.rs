//! The data-extraction collaborator seam.
//!
//! Once the engine has a confirmed record-detail tab it hands the tab
//! over and folds the report into the run's status data. The report never
//! feeds back into navigation decisions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::driver::TabHandle;
use crate::errors::NavigationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub success: bool,
    pub records_inserted: u64,
    pub error: Option<String>,
}

impl ExtractionReport {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            records_inserted: 0,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait DataExtractor: Send + Sync {
    async fn extract(
        &self,
        record_id: &str,
        tab: &TabHandle,
    ) -> Result<ExtractionReport, NavigationError>;
}

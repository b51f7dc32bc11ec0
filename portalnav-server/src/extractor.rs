//! Built-in extraction collaborator: reads the record-detail content and
//! logs it. Deployments with a real ingestion pipeline implement
//! [`DataExtractor`] themselves and wire it in instead.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use portalnav::{DataExtractor, ExtractionReport, NavigationError, RemoteUIDriver, TabHandle};

pub struct PageTextExtractor {
    driver: Arc<dyn RemoteUIDriver>,
    /// Element whose text is the record's rendered content.
    content_element: String,
}

impl PageTextExtractor {
    pub fn new(driver: Arc<dyn RemoteUIDriver>, content_element: String) -> Self {
        Self {
            driver,
            content_element,
        }
    }
}

#[async_trait]
impl DataExtractor for PageTextExtractor {
    async fn extract(
        &self,
        record_id: &str,
        tab: &TabHandle,
    ) -> Result<ExtractionReport, NavigationError> {
        let element = self
            .driver
            .locate(tab, &self.content_element)
            .await
            .map_err(|e| NavigationError::Extraction(format!("record content: {e}")))?;
        let text = self
            .driver
            .read_text(&element)
            .await
            .map_err(|e| NavigationError::Extraction(format!("record content: {e}")))?;

        info!(%record_id, bytes = text.len(), "record content extracted");
        Ok(ExtractionReport {
            success: true,
            records_inserted: 1,
            error: None,
        })
    }
}

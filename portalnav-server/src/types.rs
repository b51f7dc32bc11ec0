use serde::{Deserialize, Serialize};

use portalnav::RunMode;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StartRunRequest {
    /// "first", "next", or "specific".
    pub mode: String,

    /// Required when mode is "specific".
    #[serde(default, alias = "recordId")]
    pub record_id: Option<String>,
}

impl StartRunRequest {
    pub fn run_mode(&self) -> Result<RunMode, String> {
        match self.mode.as_str() {
            "first" => Ok(RunMode::FirstCase),
            "next" => Ok(RunMode::NextCase),
            "specific" => match &self.record_id {
                Some(id) if !id.is_empty() => Ok(RunMode::SpecificCase(id.clone())),
                _ => Err("mode 'specific' requires a non-empty 'record_id'".to_string()),
            },
            other => Err(format!(
                "unknown mode '{other}' (expected 'first', 'next', or 'specific')"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRunResponse {
    pub status: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSelectionRequest {
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSelectionResponse {
    pub status: String,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

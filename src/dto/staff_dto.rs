use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StartSessionRequest {
    /// Staff override: start even while some invited students read as
    /// disconnected.
    #[serde(default)]
    pub force_start: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheatingSummaryResponse {
    pub session_id: uuid::Uuid,
    pub counts_by_type: HashMap<String, i64>,
    pub total: i64,
}

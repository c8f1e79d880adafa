use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Known client-side detector signals. The set is open: detectors may
/// report types this build has never heard of, so the column stays text
/// and unknown values are stored as-is.
pub mod event_types {
    pub const TAB_SWITCH: &str = "TAB_SWITCH";
    pub const FOCUS_LOST: &str = "FOCUS_LOST";
    pub const FULLSCREEN_EXIT: &str = "FULLSCREEN_EXIT";
    pub const COPY_PASTE: &str = "COPY_PASTE";
    pub const RIGHT_CLICK: &str = "RIGHT_CLICK";
    pub const DEVTOOLS_OPEN: &str = "DEVTOOLS_OPEN";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheatingEvent {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Option<JsonValue>,
}

use crate::models::participant::ParticipantView;
use crate::models::session::SessionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyRequest {
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LogEventRequest {
    #[validate(length(min = 1, max = 64))]
    pub event_type: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetMessagesQuery {
    pub since: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub upto_message_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub result_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RankingsQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Student-facing poll response: enough to drive the waiting-room and
/// in-exam UI without exposing other participants' records.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatusResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub actual_start_at: Option<chrono::DateTime<chrono::Utc>>,
    pub participant: Option<ParticipantView>,
    pub unread_messages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_length_bounds() {
        let empty = SendMessageRequest {
            content: String::new(),
        };
        assert!(empty.validate().is_err());

        let ok = SendMessageRequest {
            content: "hello".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_long = SendMessageRequest {
            content: "x".repeat(2001),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn event_type_must_be_short_and_nonempty() {
        let ok = LogEventRequest {
            event_type: "TAB_SWITCH".to_string(),
            metadata: None,
        };
        assert!(ok.validate().is_ok());

        let empty = LogEventRequest {
            event_type: String::new(),
            metadata: None,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn rankings_limit_bounds() {
        assert!(RankingsQuery { limit: Some(0) }.validate().is_err());
        assert!(RankingsQuery { limit: Some(10) }.validate().is_ok());
        assert!(RankingsQuery { limit: Some(101) }.validate().is_err());
        assert!(RankingsQuery { limit: None }.validate().is_ok());
    }
}

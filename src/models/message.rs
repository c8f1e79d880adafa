use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sender_type", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    Student,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender_type: SenderType,
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Per-reader read cursor. Read state is tracked separately from the
/// message rows because every recipient reads independently.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRead {
    pub session_id: Uuid,
    pub reader_id: Uuid,
    pub last_read_message_id: Uuid,
    pub last_read_sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

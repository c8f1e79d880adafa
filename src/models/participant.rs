use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub is_connected: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub is_ready: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_id: Option<Uuid>,
}

impl Participant {
    /// Connectivity as staff tooling and the start gate must see it: the
    /// stored flag alone is not enough, the heartbeat must also be recent.
    pub fn effective_connected(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        crate::liveness::effective_connected(self.is_connected, self.last_heartbeat, now, timeout)
    }
}

/// Participant as returned to staff monitoring: the raw row plus the
/// derived connectivity, computed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub effective_connected: bool,
}

impl ParticipantView {
    pub fn at(participant: Participant, now: DateTime<Utc>, timeout: Duration) -> Self {
        let effective_connected = participant.effective_connected(now, timeout);
        Self {
            participant,
            effective_connected,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Assignment row, owned by the assignment subsystem and consumed
/// read-only here. An assignment targets either a single student or a
/// group; the invite list is resolved from whichever is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub status: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub target_student_id: Option<Uuid>,
    pub target_group_id: Option<Uuid>,
}

impl Assignment {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == "active" && self.valid_from <= now && now < self.valid_to
    }
}

/// Exam definition, owned by the content subsystem. Only exams with the
/// synchronized-room access type may be coordinated here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub duration_minutes: i32,
    pub access_type: String,
}

pub const ROOM_ACCESS_TYPE: &str = "room";

/// Score row written by the external result sink; read by the ranking
/// service through the participant's one-way result_id binding.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamResult {
    pub id: Uuid,
    pub student_id: Uuid,
    pub simulation_id: Uuid,
    pub score: rust_decimal::Decimal,
    pub duration_seconds: i32,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assignment(status: &str, from: i64, to: i64) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            status: status.to_string(),
            valid_from: Utc.timestamp_opt(from, 0).unwrap(),
            valid_to: Utc.timestamp_opt(to, 0).unwrap(),
            target_student_id: None,
            target_group_id: None,
        }
    }

    #[test]
    fn validity_window_is_half_open() {
        let a = assignment("active", 100, 200);
        assert!(!a.is_active_at(Utc.timestamp_opt(99, 0).unwrap()));
        assert!(a.is_active_at(Utc.timestamp_opt(100, 0).unwrap()));
        assert!(a.is_active_at(Utc.timestamp_opt(199, 0).unwrap()));
        assert!(!a.is_active_at(Utc.timestamp_opt(200, 0).unwrap()));
    }

    #[test]
    fn inactive_assignment_is_never_valid() {
        let a = assignment("archived", 100, 200);
        assert!(!a.is_active_at(Utc.timestamp_opt(150, 0).unwrap()));
    }
}

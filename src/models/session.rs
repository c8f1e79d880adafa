use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a session. WAITING is the only initial state; COMPLETED
/// and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Waiting,
    Started,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    /// Legal transitions: WAITING -> STARTED, WAITING -> CANCELLED,
    /// STARTED -> COMPLETED, STARTED -> CANCELLED. Everything else is
    /// unreachable through the service layer.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Waiting, SessionStatus::Started)
                | (SessionStatus::Waiting, SessionStatus::Cancelled)
                | (SessionStatus::Started, SessionStatus::Completed)
                | (SessionStatus::Started, SessionStatus::Cancelled)
        )
    }

    /// Terminal state reached when a session is ended from this state.
    /// Ending before start is a cancellation, not a completion.
    pub fn end_target(self) -> Option<SessionStatus> {
        match self {
            SessionStatus::Waiting => Some(SessionStatus::Cancelled),
            SessionStatus::Started => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub simulation_id: Uuid,
    pub assignment_id: Uuid,
    pub status: SessionStatus,
    pub scheduled_start_at: Option<DateTime<Utc>>,
    pub actual_start_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_documented_transitions_are_legal() {
        use SessionStatus::*;
        let all = [Waiting, Started, Completed, Cancelled];
        let legal = [
            (Waiting, Started),
            (Waiting, Cancelled),
            (Started, Completed),
            (Started, Cancelled),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn ending_from_waiting_cancels_instead_of_completing() {
        assert_eq!(
            SessionStatus::Waiting.end_target(),
            Some(SessionStatus::Cancelled)
        );
        assert_eq!(
            SessionStatus::Started.end_target(),
            Some(SessionStatus::Completed)
        );
        assert_eq!(SessionStatus::Completed.end_target(), None);
        assert_eq!(SessionStatus::Cancelled.end_target(), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!SessionStatus::Waiting.is_terminal());
        assert!(!SessionStatus::Started.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }
}

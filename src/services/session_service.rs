use crate::error::{Error, Result};
use crate::models::assignment::{Assignment, ROOM_ACCESS_TYPE};
use crate::models::cheating_event::CheatingEvent;
use crate::models::participant::{Participant, ParticipantView};
use crate::models::session::{Session, SessionStatus};
use crate::services::directory_service::DirectoryService;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    directory: DirectoryService,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        let directory = DirectoryService::new(pool.clone());
        Self { pool, directory }
    }

    pub async fn get_by_id(&self, session_id: Uuid) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(r#"SELECT * FROM sessions WHERE id = $1"#)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;
        Ok(session)
    }

    /// Returns the live session for an assignment, creating one in WAITING
    /// if none exists. Creation is guarded by a partial unique index on
    /// assignment_id over non-terminal sessions; the loser of a concurrent
    /// create re-reads the winner's row.
    pub async fn get_or_create(&self, assignment_id: Uuid) -> Result<Session> {
        let now = Utc::now();
        let assignment = self.directory.get_assignment(assignment_id).await?;
        if !assignment.is_active_at(now) {
            return Err(Error::Conflict(format!(
                "Assignment {} is not active or its validity window has passed",
                assignment_id
            )));
        }

        let exam = self.directory.get_exam(assignment.exam_id).await?;
        if exam.access_type != ROOM_ACCESS_TYPE {
            return Err(Error::Conflict(format!(
                "Exam {} has access type '{}', a synchronized room requires '{}'",
                exam.id, exam.access_type, ROOM_ACCESS_TYPE
            )));
        }

        if let Some(existing) = self.find_live_session(assignment_id).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (simulation_id, assignment_id, status, scheduled_start_at)
            VALUES ($1, $2, 'waiting', $3)
            ON CONFLICT (assignment_id) WHERE status IN ('waiting', 'started')
            DO NOTHING
            RETURNING *
            "#,
        )
        .bind(assignment.exam_id)
        .bind(assignment_id)
        .bind(assignment.valid_from)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(session) => {
                tracing::info!(session_id = %session.id, %assignment_id, "Session created");
                Ok(session)
            }
            // Lost the creation race; the winner's row exists now.
            None => self
                .find_live_session(assignment_id)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "Session for assignment {} vanished during creation",
                        assignment_id
                    ))
                }),
        }
    }

    /// WAITING -> STARTED. Unless force_start, every invited student must
    /// currently read as connected. The connectivity gate and the status
    /// flip happen in one transaction so the participant set the gate saw
    /// is the set the transition committed against.
    pub async fn start(&self, session_id: Uuid, force_start: bool) -> Result<Session> {
        let now = Utc::now();
        let timeout = crate::liveness::heartbeat_timeout();

        let mut tx = self.pool.begin().await?;

        let session =
            sqlx::query_as::<_, Session>(r#"SELECT * FROM sessions WHERE id = $1 FOR UPDATE"#)
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;

        match session.status {
            SessionStatus::Waiting => {}
            // A double-click from staff is expected; the second call
            // observes the already-started session and succeeds.
            SessionStatus::Started => return Ok(session),
            other => {
                return Err(Error::Conflict(format!(
                    "Cannot start a session in state {:?}",
                    other
                )))
            }
        }

        if !force_start {
            let assignment = sqlx::query_as::<_, Assignment>(
                r#"SELECT id, exam_id, status, valid_from, valid_to, target_student_id, target_group_id
                   FROM assignments WHERE id = $1"#,
            )
            .bind(session.assignment_id)
            .fetch_one(&mut *tx)
            .await?;

            let invited = invited_students_tx(&mut tx, &assignment).await?;
            let participants = sqlx::query_as::<_, Participant>(
                r#"SELECT * FROM participants WHERE session_id = $1"#,
            )
            .bind(session_id)
            .fetch_all(&mut *tx)
            .await?;

            let offline: Vec<Uuid> = invited
                .iter()
                .copied()
                .filter(|student_id| {
                    !participants
                        .iter()
                        .any(|p| p.student_id == *student_id && p.effective_connected(now, timeout))
                })
                .collect();

            if !offline.is_empty() {
                return Err(Error::PreconditionFailed(format!(
                    "{} of {} invited students are not connected: {}",
                    offline.len(),
                    invited.len(),
                    offline
                        .iter()
                        .map(Uuid::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }

        // Compare-and-swap on the current status; a concurrent start that
        // already won leaves nothing to update here.
        let started = sqlx::query_as::<_, Session>(
            r#"
            UPDATE sessions
            SET status = 'started', actual_start_at = $2
            WHERE id = $1 AND status = 'waiting'
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        match started {
            Some(session) => {
                tracing::info!(session_id = %session.id, force_start, "Session started");
                Ok(session)
            }
            None => {
                let current = self.get_by_id(session_id).await?;
                if current.status == SessionStatus::Started {
                    Ok(current)
                } else {
                    Err(Error::Conflict(format!(
                        "Cannot start a session in state {:?}",
                        current.status
                    )))
                }
            }
        }
    }

    /// STARTED -> COMPLETED, or WAITING -> CANCELLED for a room that never
    /// started. Ending an already-terminal session is idempotent.
    pub async fn end(&self, session_id: Uuid) -> Result<Session> {
        // The CAS can lose to a concurrent start (waiting -> started), in
        // which case the end is retried against the new state once.
        for _ in 0..3 {
            let session = self.get_by_id(session_id).await?;
            let Some(target) = session.status.end_target() else {
                return Ok(session);
            };

            let ended = sqlx::query_as::<_, Session>(
                r#"
                UPDATE sessions
                SET status = $2, ended_at = $3
                WHERE id = $1 AND status = $4
                RETURNING *
                "#,
            )
            .bind(session_id)
            .bind(target)
            .bind(Utc::now())
            .bind(session.status)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(session) = ended {
                tracing::info!(session_id = %session.id, status = ?session.status, "Session ended");
                return Ok(session);
            }
        }

        Err(Error::Conflict(format!(
            "Session {} kept changing state while ending",
            session_id
        )))
    }

    /// Full monitoring snapshot for staff: session, every participant with
    /// connectivity derived from the stored heartbeat right now, and each
    /// participant's cheating events. Never cached.
    pub async fn get_state(&self, session_id: Uuid) -> Result<SessionState> {
        let now = Utc::now();
        let timeout = crate::liveness::heartbeat_timeout();

        let session = self.get_by_id(session_id).await?;

        let participants = sqlx::query_as::<_, Participant>(
            r#"SELECT * FROM participants WHERE session_id = $1 ORDER BY joined_at ASC"#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let events = sqlx::query_as::<_, CheatingEvent>(
            r#"
            SELECT ce.* FROM cheating_events ce
            JOIN participants p ON p.id = ce.participant_id
            WHERE p.session_id = $1
            ORDER BY ce.occurred_at ASC, ce.id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let participants = participants
            .into_iter()
            .map(|p| {
                let cheating_events = events
                    .iter()
                    .filter(|e| e.participant_id == p.id)
                    .cloned()
                    .collect();
                ParticipantState {
                    participant: ParticipantView::at(p, now, timeout),
                    cheating_events,
                }
            })
            .collect();

        Ok(SessionState {
            session,
            participants,
        })
    }

    async fn find_live_session(&self, assignment_id: Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE assignment_id = $1 AND status IN ('waiting', 'started')
            "#,
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }
}

async fn invited_students_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assignment: &Assignment,
) -> Result<Vec<Uuid>> {
    if let Some(student_id) = assignment.target_student_id {
        return Ok(vec![student_id]);
    }
    let Some(group_id) = assignment.target_group_id else {
        return Err(Error::Conflict(format!(
            "Assignment {} targets neither a student nor a group",
            assignment.id
        )));
    };
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT student_id FROM group_members WHERE group_id = $1 ORDER BY student_id"#,
    )
    .bind(group_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session: Session,
    pub participants: Vec<ParticipantState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantState {
    #[serde(flatten)]
    pub participant: ParticipantView,
    pub cheating_events: Vec<CheatingEvent>,
}

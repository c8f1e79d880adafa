use crate::error::{Error, Result};
use crate::models::participant::Participant;
use crate::models::session::SessionStatus;
use crate::services::directory_service::DirectoryService;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ParticipantService {
    pool: PgPool,
    directory: DirectoryService,
}

impl ParticipantService {
    pub fn new(pool: PgPool) -> Self {
        let directory = DirectoryService::new(pool.clone());
        Self { pool, directory }
    }

    pub async fn get_by_id(&self, participant_id: Uuid) -> Result<Participant> {
        let participant =
            sqlx::query_as::<_, Participant>(r#"SELECT * FROM participants WHERE id = $1"#)
                .bind(participant_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("Participant {} not found", participant_id))
                })?;
        Ok(participant)
    }

    pub async fn get_for_session(&self, session_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"SELECT * FROM participants WHERE session_id = $1 ORDER BY joined_at ASC"#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    pub async fn find_by_student(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"SELECT * FROM participants WHERE session_id = $1 AND student_id = $2"#,
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    /// Gate for session-scoped reads (chat, rankings, status): the caller
    /// must be a participant or at least on the invite list. Returns the
    /// participant row when one exists; Ok(None) for a student who is
    /// invited but has not joined yet.
    pub async fn ensure_member(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Participant>> {
        if let Some(participant) = self.find_by_student(session_id, student_id).await? {
            return Ok(Some(participant));
        }

        let assignment_id: (Uuid,) =
            sqlx::query_as(r#"SELECT assignment_id FROM sessions WHERE id = $1"#)
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;

        let assignment = self.directory.get_assignment(assignment_id.0).await?;
        let invited = self.directory.invited_students(&assignment).await?;
        if invited.contains(&student_id) {
            Ok(None)
        } else {
            Err(Error::Forbidden(format!(
                "Student {} is not a member of session {}",
                student_id, session_id
            )))
        }
    }

    /// Join or rejoin a session. Upsert keyed on (session_id, student_id):
    /// a rejoin after disconnect revives the existing row, it never
    /// creates a second one.
    pub async fn join(&self, session_id: Uuid, student_id: Uuid) -> Result<Participant> {
        let session: (Uuid, SessionStatus, Uuid) = sqlx::query_as(
            r#"SELECT id, status, assignment_id FROM sessions WHERE id = $1"#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;

        let (_, status, assignment_id) = session;
        if status.is_terminal() {
            return Err(Error::Conflict(format!(
                "Session {} has ended, joining is no longer possible",
                session_id
            )));
        }

        let assignment = self.directory.get_assignment(assignment_id).await?;
        let invited = self.directory.invited_students(&assignment).await?;
        if !invited.contains(&student_id) {
            return Err(Error::Forbidden(format!(
                "Student {} is not invited to session {}",
                student_id, session_id
            )));
        }

        let now = Utc::now();
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (session_id, student_id, is_connected, last_heartbeat, is_ready, joined_at)
            VALUES ($1, $2, TRUE, $3, FALSE, $3)
            ON CONFLICT (session_id, student_id)
            DO UPDATE SET is_connected = TRUE, last_heartbeat = EXCLUDED.last_heartbeat, left_at = NULL
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(student_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(%session_id, %student_id, participant_id = %participant.id, "Participant joined");
        Ok(participant)
    }

    /// Single-row timestamp bump. Called every few seconds by every
    /// client; concurrent heartbeats are last-write-wins and harmless.
    /// The student_id condition folds the ownership check into the same
    /// statement so the hot path stays one write.
    pub async fn heartbeat(&self, participant_id: Uuid, student_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET last_heartbeat = $1, is_connected = TRUE
            WHERE id = $2 AND student_id = $3
            "#,
        )
        .bind(Utc::now())
        .bind(participant_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Cold path: distinguish a missing row from someone else's.
            let existing = self.get_by_id(participant_id).await?;
            return Err(Error::Forbidden(format!(
                "Participant {} belongs to another student",
                existing.id
            )));
        }
        Ok(())
    }

    /// Readiness is informational for the staff view only; the start gate
    /// looks at connectivity, never at this flag.
    pub async fn set_ready(&self, participant_id: Uuid, ready: bool) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"UPDATE participants SET is_ready = $2 WHERE id = $1 RETURNING *"#,
        )
        .bind(participant_id)
        .bind(ready)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))?;
        Ok(participant)
    }

    /// Client-initiated sign-off. The row survives so the presence history
    /// stays reviewable.
    pub async fn disconnect(&self, participant_id: Uuid) -> Result<Participant> {
        self.sign_off(participant_id).await
    }

    /// Staff-initiated removal from an active room. Same row effect as a
    /// disconnect; logged louder.
    pub async fn kick(&self, participant_id: Uuid) -> Result<Participant> {
        let participant = self.sign_off(participant_id).await?;
        tracing::warn!(
            participant_id = %participant.id,
            session_id = %participant.session_id,
            "Participant kicked by staff"
        );
        Ok(participant)
    }

    /// One-way binding of the externally recorded result. Conditioned on
    /// completed_at still being unset: a second call conflicts and the
    /// first result_id is retained.
    pub async fn mark_completed(&self, participant_id: Uuid, result_id: Uuid) -> Result<Participant> {
        let updated = sqlx::query_as::<_, Participant>(
            r#"
            UPDATE participants
            SET completed_at = $2, result_id = $3
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(Utc::now())
        .bind(result_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(participant) => {
                tracing::info!(%participant_id, %result_id, "Participant completed");
                Ok(participant)
            }
            None => {
                let existing = self.get_by_id(participant_id).await?;
                Err(Error::Conflict(format!(
                    "Participant {} already completed with result {}",
                    participant_id,
                    existing
                        .result_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                )))
            }
        }
    }

    async fn sign_off(&self, participant_id: Uuid) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            UPDATE participants
            SET is_connected = FALSE, left_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Participant {} not found", participant_id)))?;
        Ok(participant)
    }
}

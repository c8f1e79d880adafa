use crate::error::{Error, Result};
use crate::models::cheating_event::CheatingEvent;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CheatingService {
    pool: PgPool,
}

impl CheatingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one integrity signal. Client detectors fire the same signal
    /// repeatedly (rapid tab switching is one event per switch); the log
    /// stores every occurrence and never deduplicates. Aggregation is a
    /// read-side concern.
    pub async fn log_event(
        &self,
        participant_id: Uuid,
        event_type: &str,
        metadata: Option<JsonValue>,
    ) -> Result<CheatingEvent> {
        let exists: Option<(Uuid,)> =
            sqlx::query_as(r#"SELECT id FROM participants WHERE id = $1"#)
                .bind(participant_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!(
                "Participant {} not found",
                participant_id
            )));
        }

        let event = sqlx::query_as::<_, CheatingEvent>(
            r#"
            INSERT INTO cheating_events (participant_id, event_type, metadata)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(event_type)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(%participant_id, event_type, "Cheating event logged");
        Ok(event)
    }

    pub async fn list_for_participant(&self, participant_id: Uuid) -> Result<Vec<CheatingEvent>> {
        let events = sqlx::query_as::<_, CheatingEvent>(
            r#"
            SELECT * FROM cheating_events
            WHERE participant_id = $1
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<CheatingEvent>> {
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
        Ok(events)
    }

    /// Per-type totals across a session, for the staff monitor.
    pub async fn count_by_type(
        &self,
        session_id: Uuid,
    ) -> Result<std::collections::HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT ce.event_type, COUNT(*) FROM cheating_events ce
            JOIN participants p ON p.id = ce.participant_id
            WHERE p.session_id = $1
            GROUP BY ce.event_type
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

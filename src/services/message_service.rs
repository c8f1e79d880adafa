use crate::error::{Error, Result};
use crate::models::message::{Message, MessageRead, SenderType};
use crate::models::session::SessionStatus;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Content safety is an external collaborator's job; this layer only
    /// enforces length bounds (done at the DTO) and session state.
    /// Students may only post while the room is live; staff may also
    /// message a waiting room.
    pub async fn send(
        &self,
        session_id: Uuid,
        sender_type: SenderType,
        sender_id: Uuid,
        content: String,
    ) -> Result<Message> {
        let status: (SessionStatus,) =
            sqlx::query_as(r#"SELECT status FROM sessions WHERE id = $1"#)
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;

        if sender_type == SenderType::Student && status.0.is_terminal() {
            return Err(Error::Conflict(format!(
                "Session {} has ended, messages are closed",
                session_id
            )));
        }

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (session_id, sender_type, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(sender_type)
        .bind(sender_id)
        .bind(&content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Ascending by (sent_at, id); id breaks sent_at ties so concurrent
    /// sends still read back in one stable order. With `since`, returns
    /// only messages strictly after that message for incremental polling.
    pub async fn get_for_session(
        &self,
        session_id: Uuid,
        since: Option<Uuid>,
    ) -> Result<Vec<Message>> {
        let messages = match since {
            None => {
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT * FROM messages
                    WHERE session_id = $1
                    ORDER BY sent_at ASC, id ASC
                    "#,
                )
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?
            }
            Some(since_id) => {
                let cursor = self.get_message(session_id, since_id).await?;
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT * FROM messages
                    WHERE session_id = $1 AND (sent_at, id) > ($2, $3)
                    ORDER BY sent_at ASC, id ASC
                    "#,
                )
                .bind(session_id)
                .bind(cursor.sent_at)
                .bind(cursor.id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(messages)
    }

    /// Records that a reader has seen everything up to a message. The
    /// cursor only moves forward; replaying an older mark is a no-op.
    pub async fn mark_read(
        &self,
        session_id: Uuid,
        reader_id: Uuid,
        upto_message_id: Uuid,
    ) -> Result<MessageRead> {
        let upto = self.get_message(session_id, upto_message_id).await?;

        let read = sqlx::query_as::<_, MessageRead>(
            r#"
            INSERT INTO message_reads (session_id, reader_id, last_read_message_id, last_read_sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id, reader_id)
            DO UPDATE SET
                last_read_message_id = EXCLUDED.last_read_message_id,
                last_read_sent_at = EXCLUDED.last_read_sent_at,
                updated_at = NOW()
            WHERE (message_reads.last_read_sent_at, message_reads.last_read_message_id)
                < (EXCLUDED.last_read_sent_at, EXCLUDED.last_read_message_id)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(reader_id)
        .bind(upto.id)
        .bind(upto.sent_at)
        .fetch_optional(&self.pool)
        .await?;

        match read {
            Some(read) => Ok(read),
            // The conditional upsert skipped a backwards move; return the
            // existing cursor.
            None => {
                let existing = sqlx::query_as::<_, MessageRead>(
                    r#"SELECT * FROM message_reads WHERE session_id = $1 AND reader_id = $2"#,
                )
                .bind(session_id)
                .bind(reader_id)
                .fetch_one(&self.pool)
                .await?;
                Ok(existing)
            }
        }
    }

    /// Messages sent by others after the reader's cursor.
    pub async fn unread_count(&self, session_id: Uuid, reader_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages m
            LEFT JOIN message_reads mr
                ON mr.session_id = m.session_id AND mr.reader_id = $2
            WHERE m.session_id = $1
              AND m.sender_id <> $2
              AND (mr.reader_id IS NULL
                   OR (m.sent_at, m.id) > (mr.last_read_sent_at, mr.last_read_message_id))
            "#,
        )
        .bind(session_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn get_message(&self, session_id: Uuid, message_id: Uuid) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"SELECT * FROM messages WHERE id = $1 AND session_id = $2"#,
        )
        .bind(message_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Message {} not found in session {}",
                message_id, session_id
            ))
        })?;
        Ok(message)
    }
}

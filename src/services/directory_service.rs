use crate::error::{Error, Result};
use crate::models::assignment::{Assignment, Exam};
use sqlx::PgPool;
use uuid::Uuid;

/// Read-only access to the assignment and exam tables owned by the
/// external content subsystems. The coordinator never writes these.
#[derive(Clone)]
pub struct DirectoryService {
    pool: PgPool,
}

impl DirectoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_assignment(&self, assignment_id: Uuid) -> Result<Assignment> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"SELECT id, exam_id, status, valid_from, valid_to, target_student_id, target_group_id
               FROM assignments WHERE id = $1"#,
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Assignment {} not found", assignment_id)))?;

        Ok(assignment)
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<Exam> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"SELECT id, duration_minutes, access_type FROM exams WHERE id = $1"#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))?;

        Ok(exam)
    }

    /// Resolves the invite list: the single targeted student, or every
    /// member of the targeted group.
    pub async fn invited_students(&self, assignment: &Assignment) -> Result<Vec<Uuid>> {
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
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

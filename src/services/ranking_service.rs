use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct RankingService {
    pool: PgPool,
}

/// One completed participant's scored result, as read from the store in
/// leaderboard order.
#[derive(Debug, Clone, FromRow)]
pub struct RankRow {
    pub student_id: Uuid,
    pub result_id: Uuid,
    pub score: Decimal,
    pub duration_seconds: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub rank: i64,
    pub student_label: String,
    pub score: Decimal,
    pub duration_seconds: i32,
    pub is_current_user: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rankings {
    pub entries: Vec<RankingEntry>,
    /// The requester's own rank, reported even when their row falls
    /// outside the returned page. None if they have no completed result.
    pub my_rank: Option<i64>,
    pub total_ranked: usize,
}

impl RankingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live leaderboard over completed results only; an in-progress
    /// participant never appears. Score descending, faster finisher wins
    /// ties, then completion timestamp and result id keep the order
    /// deterministic when both score and duration tie.
    pub async fn get_rankings(
        &self,
        session_id: Uuid,
        limit: usize,
        current_student_id: Option<Uuid>,
        show_identities: bool,
    ) -> Result<Rankings> {
        let rows = sqlx::query_as::<_, RankRow>(
            r#"
            SELECT p.student_id, r.id AS result_id, r.score, r.duration_seconds, r.completed_at
            FROM participants p
            JOIN exam_results r ON r.id = p.result_id
            WHERE p.session_id = $1 AND p.completed_at IS NOT NULL
            ORDER BY r.score DESC, r.duration_seconds ASC, r.completed_at ASC, r.id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(build_leaderboard(
            rows,
            limit,
            current_student_id,
            show_identities,
        ))
    }
}

/// Dense ranking: rows tied on (score, duration) share a rank and the
/// next distinct pair gets the next integer, no gaps.
pub fn build_leaderboard(
    rows: Vec<RankRow>,
    limit: usize,
    current_student_id: Option<Uuid>,
    show_identities: bool,
) -> Rankings {
    let mut entries = Vec::with_capacity(rows.len().min(limit));
    let mut my_rank = None;

    let mut rank: i64 = 0;
    let mut prev_key: Option<(Decimal, i32)> = None;

    for row in &rows {
        let key = (row.score, row.duration_seconds);
        if prev_key != Some(key) {
            rank += 1;
            prev_key = Some(key);
        }

        let is_current_user = current_student_id == Some(row.student_id);
        if is_current_user {
            my_rank = Some(rank);
        }

        if entries.len() < limit {
            entries.push(RankingEntry {
                rank,
                student_label: label_for(row.student_id, show_identities || is_current_user),
                score: row.score,
                duration_seconds: row.duration_seconds,
                is_current_user,
            });
        }
    }

    Rankings {
        entries,
        my_rank,
        total_ranked: rows.len(),
    }
}

/// Competitors read as an anonymized label unless the externally supplied
/// permission flag allows full identifiers. One's own row is always real.
fn label_for(student_id: Uuid, show_identity: bool) -> String {
    if show_identity {
        student_id.to_string()
    } else {
        let s = student_id.simple().to_string();
        format!("Student {}", &s[s.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(score: i64, duration: i32, completed: i64) -> RankRow {
        RankRow {
            student_id: Uuid::new_v4(),
            result_id: Uuid::new_v4(),
            score: Decimal::from(score),
            duration_seconds: duration,
            completed_at: Utc.timestamp_opt(1_700_000_000 + completed, 0).unwrap(),
        }
    }

    #[test]
    fn faster_finisher_ranks_above_equal_score() {
        // 90 points in 100s beats 90 points in 120s
        let rows = vec![row(90, 100, 2), row(90, 120, 1)];
        let rankings = build_leaderboard(rows, 10, None, true);
        assert_eq!(rankings.entries[0].duration_seconds, 100);
        assert_eq!(rankings.entries[0].rank, 1);
        assert_eq!(rankings.entries[1].duration_seconds, 120);
        assert_eq!(rankings.entries[1].rank, 2);
    }

    #[test]
    fn dense_ranks_have_no_gaps() {
        let rows = vec![row(100, 60, 1), row(90, 80, 2), row(90, 80, 3), row(80, 50, 4)];
        let rankings = build_leaderboard(rows, 10, None, true);
        let ranks: Vec<i64> = rankings.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 3]);
    }

    #[test]
    fn own_rank_reported_outside_page() {
        let mut rows: Vec<RankRow> = (0..5).map(|i| row(100 - i, 60, i)).collect();
        let me = row(10, 60, 99);
        let my_id = me.student_id;
        rows.push(me);

        let rankings = build_leaderboard(rows, 3, Some(my_id), false);
        assert_eq!(rankings.entries.len(), 3);
        assert!(rankings.entries.iter().all(|e| !e.is_current_user));
        assert_eq!(rankings.my_rank, Some(6));
        assert_eq!(rankings.total_ranked, 6);
    }

    #[test]
    fn labels_anonymized_without_permission() {
        let rows = vec![row(50, 60, 1)];
        let full_id = rows[0].student_id.to_string();

        let hidden = build_leaderboard(rows.clone(), 10, None, false);
        assert!(hidden.entries[0].student_label.starts_with("Student "));
        assert_ne!(hidden.entries[0].student_label, full_id);

        let shown = build_leaderboard(rows, 10, None, true);
        assert_eq!(shown.entries[0].student_label, full_id);
    }

    #[test]
    fn own_row_keeps_identity_even_when_anonymized() {
        let mine = row(50, 60, 1);
        let my_id = mine.student_id;
        let rankings = build_leaderboard(vec![mine], 10, Some(my_id), false);
        assert_eq!(rankings.entries[0].student_label, my_id.to_string());
        assert!(rankings.entries[0].is_current_user);
    }
}

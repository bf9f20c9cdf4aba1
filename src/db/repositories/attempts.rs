use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_u32},
    models::{AttemptRecord, AttemptSummary},
};
use crate::models::{AttendanceStatus, PassFail, TerminationReason};

fn row_to_attempt(row: &Row) -> Result<AttemptRecord> {
    let started_at: String = row.get("started_at")?;
    let finished_at: String = row.get("finished_at")?;
    let attendance: String = row.get("attendance")?;
    let pass_fail: String = row.get("pass_fail")?;
    let termination_reason: String = row.get("termination_reason")?;

    Ok(AttemptRecord {
        id: row.get("id")?,
        quiz_code: row.get("quiz_code")?,
        subject: row.get("subject")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        finished_at: parse_datetime(&finished_at, "finished_at")?,
        score: to_u32(row.get("score")?, "score")?,
        total: to_u32(row.get("total")?, "total")?,
        attendance_status: AttendanceStatus::parse(&attendance)?,
        pass_fail: PassFail::parse(&pass_fail)?,
        termination_reason: TerminationReason::parse(&termination_reason)?,
        violations: to_u32(row.get("violations")?, "violations")?,
        remaining_secs: to_u32(row.get("remaining_secs")?, "remaining_secs")?,
    })
}

impl Database {
    pub async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        let record = attempt.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attempts (id, quiz_code, started_at, finished_at, score, total, attendance, pass_fail, termination_reason, violations, remaining_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.quiz_code,
                    format_datetime(&record.started_at),
                    format_datetime(&record.finished_at),
                    record.score,
                    record.total,
                    record.attendance_status.as_str(),
                    record.pass_fail.as_str(),
                    record.termination_reason.as_str(),
                    record.violations,
                    record.remaining_secs,
                ],
            )
            .with_context(|| "failed to insert attempt")?;
            Ok(())
        })
        .await
    }

    /// Newest first, with the quiz subject when the quiz is known.
    pub async fn list_attempts(&self, limit: u32) -> Result<Vec<AttemptRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.quiz_code, q.subject, a.started_at, a.finished_at, a.score, a.total,
                        a.attendance, a.pass_fail, a.termination_reason, a.violations, a.remaining_secs
                 FROM attempts a
                 LEFT JOIN quizzes q ON q.code = a.quiz_code
                 ORDER BY a.finished_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut attempts = Vec::new();
            while let Some(row) = rows.next()? {
                attempts.push(row_to_attempt(row)?);
            }
            Ok(attempts)
        })
        .await
    }

    pub async fn attempt_summary(&self) -> Result<AttemptSummary> {
        self.execute(|conn| {
            let summary = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(AVG(score), 0.0),
                        COALESCE(SUM(CASE WHEN attendance = 'Present' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN pass_fail = 'Pass' THEN 1 ELSE 0 END), 0)
                 FROM attempts",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?;

            Ok(AttemptSummary {
                attempts: to_u32(summary.0, "attempts")?,
                average_score: summary.1,
                present_count: to_u32(summary.2, "present_count")?,
                pass_count: to_u32(summary.3, "pass_count")?,
            })
        })
        .await
    }
}

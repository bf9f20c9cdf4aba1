use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::StoredQuiz,
};

fn row_to_quiz(row: &Row) -> Result<StoredQuiz> {
    let questions_json: String = row.get("questions_json")?;
    let created_at: String = row.get("created_at")?;

    Ok(StoredQuiz {
        code: row.get("code")?,
        subject: row.get("subject")?,
        section: row.get("section")?,
        questions: serde_json::from_str(&questions_json)
            .context("failed to decode stored questions")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_quiz(&self, quiz: &StoredQuiz) -> Result<()> {
        let record = quiz.clone();
        self.execute(move |conn| {
            let questions_json = serde_json::to_string(&record.questions)
                .context("failed to encode questions")?;
            conn.execute(
                "INSERT INTO quizzes (code, subject, section, questions_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.code,
                    record.subject,
                    record.section,
                    questions_json,
                    format_datetime(&record.created_at),
                ],
            )
            .with_context(|| format!("failed to insert quiz {}", record.code))?;
            Ok(())
        })
        .await
    }

    pub async fn get_quiz_by_code(&self, code: &str) -> Result<Option<StoredQuiz>> {
        let code = code.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT code, subject, section, questions_json, created_at
                 FROM quizzes
                 WHERE code = ?1",
            )?;

            stmt.query_row(params![code], |row| Ok(row_to_quiz(row)))
                .optional()?
                .transpose()
        })
        .await
    }

    pub async fn quiz_exists(&self, code: &str) -> Result<bool> {
        let code = code.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM quizzes WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    pub async fn list_quizzes(&self) -> Result<Vec<StoredQuiz>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, subject, section, questions_json, created_at
                 FROM quizzes
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut quizzes = Vec::new();
            while let Some(row) = rows.next()? {
                quizzes.push(row_to_quiz(row)?);
            }
            Ok(quizzes)
        })
        .await
    }
}

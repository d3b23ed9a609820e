// src/store/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::{AppError, AppResult, is_unique_violation},
    models::{
        question::{self, NewQuestion, Question, Subject},
        result::{Answer, NewTestResult, Stream, SubjectScores, TestResult},
        user::{NewUser, User},
    },
    store::{QuestionStore, ResultStore, UserStore},
};

const SELECT_QUESTIONS: &str = r#"
    SELECT id, question_number, subject, question_text, options, correct_answer, created_at
    FROM questions
"#;

const SELECT_RESULTS: &str = r#"
    SELECT
        id, user_id, username, answers, overall_score,
        physics, chemistry, maths, biology, logicalreasoning,
        recommended_stream, total_questions, created_at
    FROM test_results
"#;

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn list(&self) -> AppResult<Vec<Question>> {
        let sql = format!(
            "{} ORDER BY question_number ASC NULLS LAST, created_at ASC, id ASC",
            SELECT_QUESTIONS
        );
        let questions = sqlx::query_as::<_, Question>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list questions: {:?}", e);
                AppError::from(e)
            })?;
        Ok(questions)
    }

    async fn list_by_subject(&self, subject: Subject) -> AppResult<Vec<Question>> {
        let sql = format!(
            "{} WHERE subject = $1 ORDER BY question_number ASC NULLS LAST, created_at ASC, id ASC",
            SELECT_QUESTIONS
        );
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(subject.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    async fn find(&self, id: i64) -> AppResult<Option<Question>> {
        let sql = format!("{} WHERE id = $1", SELECT_QUESTIONS);
        let question = sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<Question>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // One array parameter, however many ids were submitted
        let sql = format!("{} WHERE id = ANY($1)", SELECT_QUESTIONS);
        let questions = sqlx::query_as::<_, Question>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch answer keys: {:?}", e);
                AppError::from(e)
            })?;
        Ok(questions)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, question: NewQuestion) -> AppResult<Question> {
        let created = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (question_number, subject, question_text, options, correct_answer)
            VALUES (
                (SELECT COALESCE(MAX(question_number), 0) + 1 FROM questions),
                $1, $2, $3, $4
            )
            RETURNING id, question_number, subject, question_text, options, correct_answer, created_at
            "#,
        )
        .bind(question.subject.as_str())
        .bind(&question.question_text)
        .bind(Json(&question.options))
        .bind(&question.correct_answer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Question number already taken, retry".to_string())
            } else {
                tracing::error!("Failed to create question: {:?}", e);
                AppError::from(e)
            }
        })?;
        Ok(created)
    }

    async fn update(&self, id: i64, question: NewQuestion) -> AppResult<Option<Question>> {
        let updated = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET subject = $1, question_text = $2, options = $3, correct_answer = $4
            WHERE id = $5
            RETURNING id, question_number, subject, question_text, options, correct_answer, created_at
            "#,
        )
        .bind(question.subject.as_str())
        .bind(&question.question_text)
        .bind(Json(&question.options))
        .bind(&question.correct_answer)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn renumber(&self) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;

        // The unique constraint on question_number is deferred to commit.
        let sql = format!("{} ORDER BY created_at ASC, id ASC FOR UPDATE", SELECT_QUESTIONS);
        let mut questions = sqlx::query_as::<_, Question>(&sql)
            .fetch_all(&mut *tx)
            .await?;

        let changed = question::renumber(&mut questions);
        for (id, number) in &changed {
            sqlx::query("UPDATE questions SET question_number = $1 WHERE id = $2")
                .bind(number)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(changed.len())
    }
}

/// Raw 'test_results' row. Subject scores live in one column each.
#[derive(Debug, FromRow)]
struct ResultRow {
    id: i64,
    user_id: Option<i64>,
    username: String,
    answers: Json<Vec<Answer>>,
    overall_score: i64,
    physics: i64,
    chemistry: i64,
    maths: i64,
    biology: i64,
    logicalreasoning: i64,
    recommended_stream: String,
    total_questions: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ResultRow> for TestResult {
    type Error = AppError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            answers: row.answers.0,
            overall_score: row.overall_score,
            subject_scores: SubjectScores {
                physics: row.physics,
                chemistry: row.chemistry,
                maths: row.maths,
                biology: row.biology,
                logicalreasoning: row.logicalreasoning,
            },
            recommended_stream: row.recommended_stream.parse()?,
            total_questions: row.total_questions,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn create(&self, result: NewTestResult) -> AppResult<TestResult> {
        let scores = result.subject_scores;
        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            INSERT INTO test_results (
                user_id, username, answers, overall_score,
                physics, chemistry, maths, biology, logicalreasoning,
                recommended_stream, total_questions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                id, user_id, username, answers, overall_score,
                physics, chemistry, maths, biology, logicalreasoning,
                recommended_stream, total_questions, created_at
            "#,
        )
        .bind(result.user_id)
        .bind(&result.username)
        .bind(Json(&result.answers))
        .bind(result.overall_score)
        .bind(scores.physics)
        .bind(scores.chemistry)
        .bind(scores.maths)
        .bind(scores.biology)
        .bind(scores.logicalreasoning)
        .bind(result.recommended_stream.as_str())
        .bind(result.total_questions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert test result: {:?}", e);
            AppError::from(e)
        })?;

        row.try_into()
    }

    async fn find(&self, id: i64) -> AppResult<Option<TestResult>> {
        let sql = format!("{} WHERE id = $1", SELECT_RESULTS);
        let row = sqlx::query_as::<_, ResultRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TestResult::try_from).transpose()
    }

    async fn list(&self) -> AppResult<Vec<TestResult>> {
        let sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_RESULTS);
        let rows = sqlx::query_as::<_, ResultRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list results: {:?}", e);
                AppError::from(e)
            })?;
        rows.into_iter().map(TestResult::try_from).collect()
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM test_results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_stream(&self) -> AppResult<BTreeMap<Stream, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT recommended_stream, COUNT(*) FROM test_results GROUP BY recommended_stream",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts: BTreeMap<Stream, i64> = Stream::ALL.into_iter().map(|s| (s, 0)).collect();
        for (stream, count) in rows {
            counts.insert(stream.parse()?, count);
        }
        Ok(counts)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password, role, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", user.username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;
        Ok(created)
    }
}

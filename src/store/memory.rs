// src/store/memory.rs

//! In-process stores. Used by tests and by `STORE_BACKEND=memory` runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        question::{self, NewQuestion, Question, Subject},
        result::{NewTestResult, Stream, TestResult},
        user::{NewUser, User},
    },
    store::{QuestionStore, ResultStore, UserStore},
};

/// Rows plus the next id to hand out.
struct Table<T> {
    next_id: i64,
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn display_order(a: &Question, b: &Question) -> std::cmp::Ordering {
    // NULLS LAST, like the Postgres query
    let number = |q: &Question| q.question_number.unwrap_or(i32::MAX);
    number(a)
        .cmp(&number(b))
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

#[derive(Default)]
pub struct MemoryQuestionStore {
    table: RwLock<Table<Question>>,
}

impl MemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn list(&self) -> AppResult<Vec<Question>> {
        let mut questions = self.table.read().await.rows.clone();
        questions.sort_by(display_order);
        Ok(questions)
    }

    async fn list_by_subject(&self, subject: Subject) -> AppResult<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .table
            .read()
            .await
            .rows
            .iter()
            .filter(|q| q.subject == subject.as_str())
            .cloned()
            .collect();
        questions.sort_by(display_order);
        Ok(questions)
    }

    async fn find(&self, id: i64) -> AppResult<Option<Question>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<Question>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.table.read().await.rows.len() as i64)
    }

    async fn create(&self, question: NewQuestion) -> AppResult<Question> {
        let mut table = self.table.write().await;
        let next_number = table
            .rows
            .iter()
            .filter_map(|q| q.question_number)
            .max()
            .unwrap_or(0)
            + 1;

        let created = Question {
            id: table.allocate_id(),
            question_number: Some(next_number),
            subject: question.subject.as_str().to_string(),
            question_text: question.question_text,
            options: Json(question.options),
            correct_answer: question.correct_answer,
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, question: NewQuestion) -> AppResult<Option<Question>> {
        let mut table = self.table.write().await;
        let Some(existing) = table.rows.iter_mut().find(|q| q.id == id) else {
            return Ok(None);
        };
        existing.subject = question.subject.as_str().to_string();
        existing.question_text = question.question_text;
        existing.options = Json(question.options);
        existing.correct_answer = question.correct_answer;
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|q| q.id != id);
        Ok(table.rows.len() < before)
    }

    async fn renumber(&self) -> AppResult<usize> {
        let mut table = self.table.write().await;
        Ok(question::renumber(&mut table.rows).len())
    }
}

#[derive(Default)]
pub struct MemoryResultStore {
    table: RwLock<Table<TestResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn create(&self, result: NewTestResult) -> AppResult<TestResult> {
        let mut table = self.table.write().await;
        let created = TestResult {
            id: table.allocate_id(),
            user_id: result.user_id,
            username: result.username,
            answers: result.answers,
            overall_score: result.overall_score,
            subject_scores: result.subject_scores,
            recommended_stream: result.recommended_stream,
            total_questions: result.total_questions,
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: i64) -> AppResult<Option<TestResult>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<TestResult>> {
        let mut results = self.table.read().await.rows.clone();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(results)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|r| r.id != id);
        Ok(table.rows.len() < before)
    }

    async fn count_by_stream(&self) -> AppResult<BTreeMap<Stream, i64>> {
        let mut counts: BTreeMap<Stream, i64> = Stream::ALL.into_iter().map(|s| (s, 0)).collect();
        for result in &self.table.read().await.rows {
            *counts.entry(result.recommended_stream).or_default() += 1;
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<Table<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        let created = User {
            id: table.allocate_id(),
            username: user.username,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }
}

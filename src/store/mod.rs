// src/store/mod.rs

//! Persistence seams. Handlers only see these traits; `postgres` backs them
//! with a `PgPool`, `memory` keeps everything in process.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        question::{NewQuestion, Question, Subject},
        result::{NewTestResult, Stream, TestResult},
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All questions ordered by number, then creation time.
    async fn list(&self) -> AppResult<Vec<Question>>;

    async fn list_by_subject(&self, subject: Subject) -> AppResult<Vec<Question>>;

    async fn find(&self, id: i64) -> AppResult<Option<Question>>;

    /// Questions whose id is in `ids`. Unknown ids are ignored.
    async fn find_many(&self, ids: &[i64]) -> AppResult<Vec<Question>>;

    async fn count(&self) -> AppResult<i64>;

    /// Inserts with the next display number (current max + 1).
    async fn create(&self, question: NewQuestion) -> AppResult<Question>;

    /// Replaces the editable fields. `None` when the id is unknown.
    async fn update(&self, id: i64, question: NewQuestion) -> AppResult<Option<Question>>;

    /// Returns false when the id is unknown.
    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Makes display numbers contiguous from 1 by creation order.
    /// Returns how many questions got a new number.
    async fn renumber(&self) -> AppResult<usize>;
}

/// Append-only history of test results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn create(&self, result: NewTestResult) -> AppResult<TestResult>;

    async fn find(&self, id: i64) -> AppResult<Option<TestResult>>;

    /// Newest first.
    async fn list(&self) -> AppResult<Vec<TestResult>>;

    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Number of results per recommended stream. Every stream is present.
    async fn count_by_stream(&self) -> AppResult<BTreeMap<Stream, i64>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn create(&self, user: NewUser) -> AppResult<User>;
}

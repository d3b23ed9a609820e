// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    report::ReportPipeline,
    store::{
        QuestionStore, ResultStore, UserStore,
        memory::{MemoryQuestionStore, MemoryResultStore, MemoryUserStore},
        postgres::{PgQuestionStore, PgResultStore, PgUserStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<dyn QuestionStore>,
    pub results: Arc<dyn ResultStore>,
    pub users: Arc<dyn UserStore>,
    /// `None` disables PDF reports.
    pub reports: Option<ReportPipeline>,
    pub config: Config,
}

impl AppState {
    pub fn postgres(pool: PgPool, config: Config, reports: Option<ReportPipeline>) -> Self {
        Self {
            questions: Arc::new(PgQuestionStore::new(pool.clone())),
            results: Arc::new(PgResultStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool)),
            reports,
            config,
        }
    }

    pub fn in_memory(config: Config, reports: Option<ReportPipeline>) -> Self {
        Self {
            questions: Arc::new(MemoryQuestionStore::new()),
            results: Arc::new(MemoryResultStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            reports,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

// src/handlers/admin.rs

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        question::{NewQuestion, QuestionRequest, Subject},
        result::ResultSummary,
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct QuestionFilter {
    pub subject: Option<String>,
}

/// Lists questions, optionally filtered by subject.
/// Admin only.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let questions = match filter.subject.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => state.questions.list_by_subject(subject.parse()?).await?,
        None => state.questions.list().await?,
    };

    Ok(Json(questions))
}

/// Adds a question with the next display number.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = state.questions.create(NewQuestion::try_from(payload)?).await?;

    tracing::info!(
        question_id = question.id,
        "Question {:?} added ({})",
        question.question_number,
        question.subject
    );

    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces a question's subject, text, options and answer.
/// Stored results keep the correctness computed when they were submitted.
/// Admin only.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .questions
        .update(id, NewQuestion::try_from(payload)?)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Deletes a question, then renumbers the rest 1..N.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.questions.delete(id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    // The delete already happened, a failed renumber only leaves a gap.
    match state.questions.renumber().await {
        Ok(changed) => tracing::info!("Renumbered questions after delete ({} changed)", changed),
        Err(e) => tracing::error!("Error renumbering questions: {}", e),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all results, newest first.
/// Admin only.
pub async fn list_results(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let results = state.results.list().await?;
    let summaries: Vec<ResultSummary> = results.iter().map(ResultSummary::from).collect();

    Ok(Json(summaries))
}

/// Deletes a result by ID.
/// Admin only.
pub async fn delete_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.results.delete(id).await? {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Question bank and result counters for the dashboard.
/// Admin only.
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let questions = state.questions.list().await?;

    let mut per_subject: BTreeMap<&str, i64> =
        Subject::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for question in &questions {
        if let Ok(subject) = question.subject.parse::<Subject>() {
            *per_subject.entry(subject.as_str()).or_default() += 1;
        }
    }

    let per_stream: BTreeMap<String, i64> = state
        .results
        .count_by_stream()
        .await?
        .into_iter()
        .map(|(stream, count)| (stream.to_string(), count))
        .collect();
    let total_results: i64 = per_stream.values().sum();

    Ok(Json(json!({
        "total_questions": questions.len(),
        "questions_per_subject": per_subject,
        "total_results": total_results,
        "results_per_stream": per_stream,
    })))
}

// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, Subject},
        result::SubmitTestRequest,
    },
    services::submission::{self, Submitter},
    state::AppState,
    utils::jwt::MaybeClaims,
};

/// Returns the whole question bank in display order, without answers.
pub async fn get_test(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let questions = state.questions.list().await?;

    if questions.is_empty() {
        tracing::warn!("No questions found in database, seed the question bank first");
        return Err(AppError::NotFound(
            "No questions found. Seed the question bank first.".to_string(),
        ));
    }

    tracing::debug!("Fetched {} questions", questions.len());

    let public_questions: Vec<PublicQuestion> =
        questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(public_questions))
}

/// Lists the available tests. There is only the combined aptitude test.
pub async fn list_tests() -> impl IntoResponse {
    let subjects: Vec<&str> = Subject::ALL.iter().map(|s| s.as_str()).collect();
    Json(json!({
        "tests": [{
            "id": "aptitude",
            "name": "Aptitude Test",
            "description": "Career aptitude assessment covering Physics, Chemistry, Mathematics, Biology, and Logical Reasoning",
            "test_type": "aptitude",
            "subjects": subjects,
        }]
    }))
}

/// Scores a test submission and returns the result page.
///
/// * An absent body or `answers` field counts as an empty submission.
/// * A valid bearer token attaches the result to that user; otherwise it is anonymous.
/// * The PDF report is produced in the background after this returns.
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(MaybeClaims(claims)): Extension<MaybeClaims>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SubmitTestRequest::default()
    } else {
        serde_json::from_slice::<SubmitTestRequest>(&body)?
    };

    let submitter = Submitter::from_claims(claims.as_ref());
    let submission = submission::submit_test(&state, submitter, request).await?;

    Ok(Json(submission.view))
}

/// Shows a stored result by id.
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view = submission::result_view(&state, id).await?;
    Ok(Json(view))
}

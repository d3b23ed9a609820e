// src/services/submission.rs

use std::collections::HashMap;

use tokio::task::JoinHandle;

use crate::{
    config::ANONYMOUS_USERNAME,
    error::{AppError, AppResult},
    models::result::{DetailedAnswer, NewTestResult, ResultView, SubmitTestRequest, TestResult},
    report::{ReportData, ReportJob, ReportOutcome},
    scoring::{self, Scorecard},
    state::AppState,
    utils::jwt::Claims,
};

/// Who submitted the test, taken from the session token when there is one.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub user_id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
}

impl Submitter {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            username: ANONYMOUS_USERNAME.to_string(),
            email: None,
        }
    }

    pub fn from_claims(claims: Option<&Claims>) -> Self {
        match claims {
            Some(claims) => Self {
                user_id: claims.user_id(),
                username: claims.username.clone(),
                email: claims.email.clone().filter(|e| !e.trim().is_empty()),
            },
            None => Self::anonymous(),
        }
    }
}

/// A stored submission plus the background report task, if one was started.
pub struct Submission {
    pub view: ResultView,
    pub report: Option<JoinHandle<ReportOutcome>>,
}

/// Scores a submission, stores the result and starts the report task.
///
/// A store failure aborts the submission. The report task is detached and
/// cannot affect the returned view.
pub async fn submit_test(
    state: &AppState,
    submitter: Submitter,
    request: SubmitTestRequest,
) -> AppResult<Submission> {
    let total_questions = state.questions.count().await?;
    let entries = scoring::answered_entries(&request.answers);

    tracing::info!(
        total_questions,
        answered = entries.len(),
        unanswered = (total_questions - entries.len() as i64).max(0),
        "Submission received"
    );

    let card = if entries.is_empty() {
        tracing::info!("User submitted test with no answers");
        Scorecard::unanswered()
    } else {
        let ids = scoring::referenced_ids(&entries);
        let questions = state
            .questions
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect::<HashMap<_, _>>();
        scoring::grade(&entries, &questions, state.config.questions_per_subject)
    };

    if let Some(decision) = &card.decision {
        let per_subject = state.config.questions_per_subject;
        tracing::info!(
            science = %format!("{}/{}", decision.science_score, 4 * per_subject),
            commerce = %format!("{}/{}", decision.commerce_score, 3 * per_subject),
            arts = %format!("{}/{}", decision.arts_score, 2 * per_subject),
            tier = ?decision.tier,
            stream = %decision.stream,
            "Stream recommendation"
        );
    }

    let result = state
        .results
        .create(NewTestResult {
            user_id: submitter.user_id,
            username: submitter.username.clone(),
            answers: card.answers.clone(),
            overall_score: card.overall_score,
            subject_scores: card.subject_scores,
            recommended_stream: card.recommended_stream,
            total_questions,
        })
        .await?;

    tracing::info!(
        result_id = result.id,
        "Test submitted by user: {} (Score: {}/{})",
        result.username,
        result.overall_score,
        total_questions
    );

    let view = ResultView {
        result_id: result.id,
        username: result.username.clone(),
        overall_score: result.overall_score,
        total_questions,
        total_questions_at_submission: result.total_questions,
        subject_scores: result.subject_scores,
        recommended_stream: result.recommended_stream,
        detailed_answers: card.detailed_answers,
        created_at: result.created_at,
    };

    let report = match &state.reports {
        Some(pipeline) => Some(pipeline.dispatch(ReportJob {
            recipient: submitter.email,
            data: report_data(&view),
        })),
        None => {
            tracing::debug!(result_id = result.id, "Report pipeline disabled, no PDF will be sent");
            None
        }
    };

    Ok(Submission { view, report })
}

fn report_data(view: &ResultView) -> ReportData {
    ReportData {
        result_id: view.result_id,
        username: view.username.clone(),
        overall_score: view.overall_score,
        total_questions: view.total_questions,
        subject_scores: view.subject_scores,
        recommended_stream: view.recommended_stream,
        date: view.created_at,
        detailed_answers: view.detailed_answers.clone(),
    }
}

/// Rebuilds the result page from storage.
///
/// Correctness comes from the stored answers. Question text and the correct
/// answer are read from the current bank; answers whose question has since
/// been deleted are left out of the breakdown. `total_questions` is the live
/// bank size.
pub async fn result_view(state: &AppState, id: i64) -> AppResult<ResultView> {
    let result = state
        .results
        .find(id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    let total_questions = state.questions.count().await?;
    let detailed_answers = detailed_answers(state, &result).await?;

    Ok(ResultView {
        result_id: result.id,
        username: result.username,
        overall_score: result.overall_score,
        total_questions,
        total_questions_at_submission: result.total_questions,
        subject_scores: result.subject_scores,
        recommended_stream: result.recommended_stream,
        detailed_answers,
        created_at: result.created_at,
    })
}

async fn detailed_answers(state: &AppState, result: &TestResult) -> AppResult<Vec<DetailedAnswer>> {
    if result.answers.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<i64> = result.answers.iter().map(|a| a.question_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let questions = state
        .questions
        .find_many(&ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect::<HashMap<_, _>>();

    Ok(result
        .answers
        .iter()
        .filter_map(|answer| {
            let question = questions.get(&answer.question_id)?;
            Some(DetailedAnswer {
                question_id: answer.question_id,
                question_text: question.question_text.clone(),
                subject: question.subject.clone(),
                selected_answer: answer.selected_answer.clone(),
                correct_answer: question.correct_answer.clone(),
                is_correct: answer.is_correct,
                options: question.options.0.clone(),
            })
        })
        .collect())
}

// src/models/result.rs

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::question::Subject};

/// One of the three recommended academic tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stream {
    Science,
    Commerce,
    Arts,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::Science, Stream::Commerce, Stream::Arts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Science => "Science",
            Stream::Commerce => "Commerce",
            Stream::Arts => "Arts",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stream::ALL
            .into_iter()
            .find(|stream| stream.as_str() == s)
            .ok_or_else(|| AppError::InternalServerError(format!("Unknown stream '{}'", s)))
    }
}

/// Correct-answer counts per subject. All five keys are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScores {
    pub physics: i64,
    pub chemistry: i64,
    pub maths: i64,
    pub biology: i64,
    pub logicalreasoning: i64,
}

impl SubjectScores {
    pub fn get(&self, subject: Subject) -> i64 {
        match subject {
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Maths => self.maths,
            Subject::Biology => self.biology,
            Subject::LogicalReasoning => self.logicalreasoning,
        }
    }

    pub fn increment(&mut self, subject: Subject) {
        let slot = match subject {
            Subject::Physics => &mut self.physics,
            Subject::Chemistry => &mut self.chemistry,
            Subject::Maths => &mut self.maths,
            Subject::Biology => &mut self.biology,
            Subject::LogicalReasoning => &mut self.logicalreasoning,
        };
        *slot += 1;
    }

    pub fn total(&self) -> i64 {
        Subject::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// The subject with the highest score, first one wins on ties.
    /// `None` when every subject is zero.
    pub fn strongest(&self) -> Option<Subject> {
        let mut best: Option<(Subject, i64)> = None;
        for subject in Subject::ALL {
            let score = self.get(subject);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((subject, score));
            }
        }
        best.map(|(subject, _)| subject)
    }
}

/// A single graded answer, embedded in a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub selected_answer: String,
    pub is_correct: bool,
}

/// Per-question breakdown shown alongside a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedAnswer {
    pub question_id: i64,
    pub question_text: String,
    pub subject: String,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub options: Vec<String>,
}

/// The persisted outcome of one test submission. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub answers: Vec<Answer>,
    pub overall_score: i64,
    pub subject_scores: SubjectScores,
    pub recommended_stream: Stream,
    /// Size of the question bank when the test was submitted.
    pub total_questions: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields of a result before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewTestResult {
    pub user_id: Option<i64>,
    pub username: String,
    pub answers: Vec<Answer>,
    pub overall_score: i64,
    pub subject_scores: SubjectScores,
    pub recommended_stream: Stream,
    pub total_questions: i64,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitTestRequest {
    /// Key: question id. Value: selected option. Null or blank means unanswered.
    #[serde(default)]
    pub answers: HashMap<String, Option<String>>,
}

/// Result page payload, returned by submit and by result lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultView {
    pub result_id: i64,
    pub username: String,
    pub overall_score: i64,
    /// Live size of the question bank.
    pub total_questions: i64,
    pub total_questions_at_submission: i64,
    pub subject_scores: SubjectScores,
    pub recommended_stream: Stream,
    pub detailed_answers: Vec<DetailedAnswer>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Row of the admin results listing.
#[derive(Debug, Serialize)]
pub struct ResultSummary {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    /// Highest scoring subject, or "general" when everything is zero.
    pub top_subject: String,
    pub overall_score: i64,
    pub subject_scores: SubjectScores,
    pub correct_answers: usize,
    pub answered_questions: usize,
    pub recommended_stream: Stream,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&TestResult> for ResultSummary {
    fn from(r: &TestResult) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            username: r.username.clone(),
            top_subject: r
                .subject_scores
                .strongest()
                .map_or_else(|| "general".to_string(), |s| s.to_string()),
            overall_score: r.overall_score,
            subject_scores: r.subject_scores,
            correct_answers: r.answers.iter().filter(|a| a.is_correct).count(),
            answered_questions: r.answers.len(),
            recommended_stream: r.recommended_stream,
            created_at: r.created_at,
        }
    }
}

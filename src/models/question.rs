// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// The five fixed question categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Physics,
    Chemistry,
    Maths,
    Biology,
    LogicalReasoning,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Maths,
        Subject::Biology,
        Subject::LogicalReasoning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Maths => "maths",
            Subject::Biology => "biology",
            Subject::LogicalReasoning => "logicalreasoning",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a stored subject. Matching is case-insensitive only; callers
/// handling admin input trim first.
impl FromStr for Subject {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == lowered)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown subject '{}'", s)))
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Display number, contiguous from 1 after every renumbering pass.
    pub question_number: Option<i32>,

    /// Kept as text: rows written before validation existed may carry
    /// subjects outside the five known ones.
    pub subject: String,

    /// Sanitized HTML of the question prompt.
    pub question_text: String,

    /// Ordered list of options, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// Must equal one of `options` byte for byte.
    pub correct_answer: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to the test taker (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_number: Option<i32>,
    pub subject: String,
    pub question_text: String,
    pub options: Vec<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_number: q.question_number,
            subject: q.subject,
            question_text: q.question_text,
            options: q.options.0,
        }
    }
}

/// DTO for creating or replacing a question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(custom(function = validate_subject))]
    pub subject: String,
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
}

impl QuestionRequest {
    /// Validates the payload and checks the answer is one of the options.
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if !self.options.iter().any(|opt| opt == &self.correct_answer) {
            return Err(AppError::BadRequest(
                "correct_answer must match one of the options".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalized question fields handed to a store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub subject: Subject,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl TryFrom<QuestionRequest> for NewQuestion {
    type Error = AppError;

    fn try_from(req: QuestionRequest) -> Result<Self, Self::Error> {
        req.check()?;
        Ok(Self {
            subject: req.subject.trim().parse()?,
            question_text: crate::utils::html::clean_html(req.question_text.trim()),
            options: req.options,
            correct_answer: req.correct_answer,
        })
    }
}

fn validate_subject(subject: &str) -> Result<(), validator::ValidationError> {
    subject
        .trim()
        .parse::<Subject>()
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("unknown_subject"))
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Reassigns display numbers 1..N by creation order (ties broken by id).
///
/// Returns the `(id, new_number)` pairs that changed, so a store only writes
/// those rows. Running it twice in a row yields no changes the second time.
pub fn renumber(questions: &mut [Question]) -> Vec<(i64, i32)> {
    questions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut changed = Vec::new();
    for (idx, question) in questions.iter_mut().enumerate() {
        let number = idx as i32 + 1;
        if question.question_number != Some(number) {
            question.question_number = Some(number);
            changed.push((question.id, number));
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn question(id: i64, number: Option<i32>, minutes: i64) -> Question {
        Question {
            id,
            question_number: number,
            subject: "physics".to_string(),
            question_text: format!("Question {}", id),
            options: Json(vec!["A".to_string(), "B".to_string()]),
            correct_answer: "A".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_renumber_closes_gaps() {
        let mut questions = vec![question(1, Some(1), 0), question(3, Some(3), 2), question(4, Some(4), 3)];

        let changed = renumber(&mut questions);

        assert_eq!(changed, vec![(3, 2), (4, 3)]);
        let numbers: Vec<_> = questions.iter().map(|q| q.question_number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_renumber_orders_by_creation_time() {
        let mut questions = vec![question(7, Some(1), 10), question(2, None, 5)];

        renumber(&mut questions);

        assert_eq!(questions[0].id, 2);
        assert_eq!(questions[0].question_number, Some(1));
        assert_eq!(questions[1].id, 7);
        assert_eq!(questions[1].question_number, Some(2));
    }

    #[test]
    fn test_renumber_is_idempotent() {
        let mut questions = vec![question(1, Some(5), 0), question(2, Some(9), 1)];

        assert_eq!(renumber(&mut questions).len(), 2);
        assert!(renumber(&mut questions).is_empty());
    }

    #[test]
    fn test_subject_parse_is_case_insensitive() {
        assert_eq!("Physics".parse::<Subject>().unwrap(), Subject::Physics);
        assert_eq!("LogicalReasoning".parse::<Subject>().unwrap(), Subject::LogicalReasoning);
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn test_stored_subject_with_padding_is_not_recognised() {
        assert!("physics ".parse::<Subject>().is_err());
        assert!(" Biology".parse::<Subject>().is_err());
    }

    #[test]
    fn test_question_request_trims_subject() {
        let req = QuestionRequest {
            subject: " Physics ".to_string(),
            question_text: "Unit of force?".to_string(),
            options: vec!["Newton".to_string(), "Joule".to_string()],
            correct_answer: "Newton".to_string(),
        };
        let question = NewQuestion::try_from(req).unwrap();
        assert_eq!(question.subject, Subject::Physics);
    }

    #[test]
    fn test_question_request_rejects_answer_outside_options() {
        let req = QuestionRequest {
            subject: "maths".to_string(),
            question_text: "2 + 2?".to_string(),
            options: vec!["3".to_string(), "4".to_string()],
            correct_answer: "5".to_string(),
        };
        assert!(matches!(req.check(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_question_request_requires_two_options() {
        let req = QuestionRequest {
            subject: "maths".to_string(),
            question_text: "2 + 2?".to_string(),
            options: vec!["4".to_string()],
            correct_answer: "4".to_string(),
        };
        assert!(req.check().is_err());
    }
}

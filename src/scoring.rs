// src/scoring.rs

//! Test scoring and stream recommendation.
//!
//! Everything here is synchronous and works on values already loaded from the
//! stores, so a submission only touches its own accumulator.

use std::collections::HashMap;

use crate::models::{
    question::{Question, Subject},
    result::{Answer, DetailedAnswer, Stream, SubjectScores},
};

/// Minimum raw points for each tier, on top of the percentage share.
const SCIENCE_MIN_POINTS: i64 = 12;
const COMMERCE_MIN_POINTS: i64 = 8;
const ARTS_MIN_BIOLOGY: i64 = 3;

/// Percentage shares, compared as `score * 100 >= percent * max`.
const SCIENCE_MIN_PERCENT: i64 = 60;
const COMMERCE_MIN_PERCENT: i64 = 53;
const ARTS_MIN_PERCENT: i64 = 50;

/// Which rule of the decision table produced the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionTier {
    Science,
    Commerce,
    Arts,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDecision {
    pub stream: Stream,
    pub tier: DecisionTier,
    pub science_score: i64,
    pub commerce_score: i64,
    pub arts_score: i64,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone)]
pub struct Scorecard {
    pub overall_score: i64,
    pub subject_scores: SubjectScores,
    pub recommended_stream: Stream,
    /// `None` for the zero-answer short-circuit, which never runs the table.
    pub decision: Option<StreamDecision>,
    pub answers: Vec<Answer>,
    pub detailed_answers: Vec<DetailedAnswer>,
}

impl Scorecard {
    /// Result of a submission with nothing answered.
    pub fn unanswered() -> Self {
        Self {
            overall_score: 0,
            subject_scores: SubjectScores::default(),
            recommended_stream: Stream::Arts,
            decision: None,
            answers: Vec::new(),
            detailed_answers: Vec::new(),
        }
    }
}

/// Drops blank answers and returns the rest sorted by question key.
///
/// Missing, empty and whitespace-only values are unanswered, not wrong.
pub fn answered_entries(submitted: &HashMap<String, Option<String>>) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = submitted
        .iter()
        .filter_map(|(key, value)| match value {
            Some(v) if !v.trim().is_empty() => Some((key.clone(), v.clone())),
            _ => None,
        })
        .collect();
    entries.sort_by(|a, b| {
        let (ka, kb) = (question_id(&a.0), question_id(&b.0));
        ka.cmp(&kb).then_with(|| a.0.cmp(&b.0))
    });
    entries
}

/// The question id a submitted key names.
///
/// Only the id's canonical decimal form matches, so `"01"`, `"+1"` or `" 1"`
/// never alias question 1.
pub fn question_id(key: &str) -> Option<i64> {
    key.parse::<i64>()
        .ok()
        .filter(|id| id.to_string() == key)
}

/// Distinct question ids referenced by the answered entries, ascending.
/// Keys that are not ids cannot match any question and are left out.
pub fn referenced_ids(entries: &[(String, String)]) -> Vec<i64> {
    let mut ids: Vec<i64> = entries
        .iter()
        .filter_map(|(key, _)| question_id(key))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Grades answered entries against the question bank.
///
/// Entries whose question cannot be resolved are skipped entirely. A correct
/// answer always counts toward the overall score, but only toward a subject
/// score when the question's subject is one of the five known ones.
pub fn grade(
    entries: &[(String, String)],
    questions: &HashMap<i64, Question>,
    questions_per_subject: i64,
) -> Scorecard {
    let mut overall_score = 0;
    let mut subject_scores = SubjectScores::default();
    let mut answers = Vec::new();
    let mut detailed_answers = Vec::new();

    for (key, selected) in entries {
        let Some(question) = question_id(key).and_then(|id| questions.get(&id)) else {
            continue;
        };

        let is_correct = selected == &question.correct_answer;

        if is_correct {
            overall_score += 1;
            if let Ok(subject) = question.subject.parse::<Subject>() {
                subject_scores.increment(subject);
            }
        }

        answers.push(Answer {
            question_id: question.id,
            selected_answer: selected.clone(),
            is_correct,
        });

        detailed_answers.push(DetailedAnswer {
            question_id: question.id,
            question_text: question.question_text.clone(),
            subject: question.subject.clone(),
            selected_answer: selected.clone(),
            correct_answer: question.correct_answer.clone(),
            is_correct,
            options: question.options.0.clone(),
        });
    }

    let decision = recommend_stream(&subject_scores, questions_per_subject);

    Scorecard {
        overall_score,
        subject_scores,
        recommended_stream: decision.stream,
        decision: Some(decision),
        answers,
        detailed_answers,
    }
}

/// Applies the stream decision table, first matching tier wins.
///
/// Tier maxima scale with `questions_per_subject` (20/15/10 for the default
/// of five). Tier three and the fallback both give Arts and are kept apart.
pub fn recommend_stream(scores: &SubjectScores, questions_per_subject: i64) -> StreamDecision {
    let per_subject = questions_per_subject.max(1);

    let science_score = scores.physics + scores.chemistry + scores.maths + scores.logicalreasoning;
    let science_max = 4 * per_subject;

    let commerce_score = scores.maths + scores.logicalreasoning + scores.chemistry;
    let commerce_max = 3 * per_subject;

    let arts_score = scores.biology + scores.logicalreasoning;
    let arts_max = 2 * per_subject;

    let (stream, tier) = if meets_share(science_score, science_max, SCIENCE_MIN_PERCENT)
        && science_score >= SCIENCE_MIN_POINTS
    {
        (Stream::Science, DecisionTier::Science)
    } else if meets_share(commerce_score, commerce_max, COMMERCE_MIN_PERCENT)
        && commerce_score >= COMMERCE_MIN_POINTS
    {
        (Stream::Commerce, DecisionTier::Commerce)
    } else if meets_share(arts_score, arts_max, ARTS_MIN_PERCENT) || scores.biology >= ARTS_MIN_BIOLOGY {
        (Stream::Arts, DecisionTier::Arts)
    } else {
        (Stream::Arts, DecisionTier::Fallback)
    };

    StreamDecision {
        stream,
        tier,
        science_score,
        commerce_score,
        arts_score,
    }
}

/// `score / max >= percent / 100`, in integers.
fn meets_share(score: i64, max: i64, percent: i64) -> bool {
    score * 100 >= percent * max
}

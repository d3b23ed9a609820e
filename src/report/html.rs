// src/report/html.rs

//! HTML for the PDF report and the email body.
//!
//! Learner-provided strings go through `ammonia::clean_text`. Question text
//! is already sanitized HTML (see `utils::html::clean_html`) and is embedded
//! as is.

use std::fmt::Write;

use ammonia::clean_text;

use crate::{models::question::Subject, report::ReportData};

/// Whole-number percentage, rounded half up. Zero when there are no questions.
pub fn percentage(score: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as i64
}

fn subject_label(subject: Subject) -> &'static str {
    match subject {
        Subject::Physics => "Physics",
        Subject::Chemistry => "Chemistry",
        Subject::Maths => "Mathematics",
        Subject::Biology => "Biology",
        Subject::LogicalReasoning => "Logical Reasoning",
    }
}

fn subject_rows(report: &ReportData) -> String {
    let mut rows = String::new();
    for subject in Subject::ALL {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td></tr>",
            subject_label(subject),
            report.subject_scores.get(subject)
        );
    }
    rows
}

/// Full result document handed to the PDF renderer.
pub fn render_report(report: &ReportData) -> String {
    let pct = percentage(report.overall_score, report.total_questions);

    let mut answers = String::new();
    for (idx, answer) in report.detailed_answers.iter().enumerate() {
        let options = answer
            .options
            .iter()
            .map(|opt| format!("<li>{}</li>", clean_text(opt)))
            .collect::<String>();
        let _ = write!(
            answers,
            r#"<div class="answer {status}">
  <h4>{number}. [{subject}] {text}</h4>
  <ul>{options}</ul>
  <p>Your answer: <strong>{selected}</strong></p>
  <p>Correct answer: <strong>{correct}</strong></p>
</div>"#,
            status = if answer.is_correct { "correct" } else { "incorrect" },
            number = idx + 1,
            subject = clean_text(&answer.subject.to_uppercase()),
            text = answer.question_text,
            options = options,
            selected = clean_text(&answer.selected_answer),
            correct = clean_text(&answer.correct_answer),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>CareerMate Test Results</title>
<style>
  body {{ font-family: Helvetica, Arial, sans-serif; color: #334155; margin: 2rem; }}
  h1 {{ color: #000ead; }}
  table {{ border-collapse: collapse; width: 100%; }}
  td {{ border: 1px solid #cbd5e1; padding: 0.4rem 0.8rem; }}
  .answer {{ border-left: 4px solid #cbd5e1; padding-left: 0.8rem; margin: 1rem 0; }}
  .correct {{ border-color: #16a34a; }}
  .incorrect {{ border-color: #dc2626; }}
</style>
</head>
<body>
<h1>CareerMate Test Results</h1>
<p>Student: <strong>{username}</strong></p>
<p>Date: {date}</p>
<h2>Score: {score}/{total} ({pct}%)</h2>
<h2>Recommended stream: {stream}</h2>
<table>{subjects}</table>
<h2>Answers</h2>
{answers}
</body>
</html>"#,
        username = clean_text(&report.username),
        date = report.date.format("%B %-d, %Y"),
        score = report.overall_score,
        total = report.total_questions,
        pct = pct,
        stream = report.recommended_stream,
        subjects = subject_rows(report),
        answers = answers,
    )
}

/// Subject line of the report email.
pub fn email_subject(report: &ReportData) -> String {
    format!(
        "Your CareerMate Test Results - {}% Score",
        percentage(report.overall_score, report.total_questions)
    )
}

/// Short HTML email body; the full report travels as the PDF attachment.
pub fn render_email(report: &ReportData) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body style="font-family: Helvetica, Arial, sans-serif; color: #334155;">
<h2>Hi {username},</h2>
<p>Thanks for taking the CareerMate aptitude test on {date}.</p>
<p>You scored <strong>{score}/{total} ({pct}%)</strong>.</p>
<p>Recommended stream: <strong>{stream}</strong></p>
<table>{subjects}</table>
<p>Your detailed report is attached as a PDF.</p>
</body>
</html>"#,
        username = clean_text(&report.username),
        date = report.date.format("%B %-d, %Y %H:%M"),
        score = report.overall_score,
        total = report.total_questions,
        pct = percentage(report.overall_score, report.total_questions),
        stream = report.recommended_stream,
        subjects = subject_rows(report),
    )
}

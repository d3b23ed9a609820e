// src/report/mod.rs

//! Background PDF report delivery.
//!
//! A submission hands a [`ReportJob`] to [`ReportPipeline::dispatch`], which
//! spawns a detached task: render (with bounded retry), then mail the PDF if
//! the learner has an address. Nothing here can fail the submission.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use url::Url;

use crate::{
    config::ReportConfig,
    models::result::{DetailedAnswer, Stream, SubjectScores},
};

pub mod html;
pub mod mailer;
pub mod renderer;

pub use mailer::SmtpNotifier;
pub use renderer::HttpPdfRenderer;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("delivery failed: {0}")]
    Send(String),

    #[error("invalid report configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Everything the report and the email body show.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub result_id: i64,
    pub username: String,
    pub overall_score: i64,
    pub total_questions: i64,
    pub subject_scores: SubjectScores,
    pub recommended_stream: Stream,
    pub date: chrono::DateTime<chrono::Utc>,
    pub detailed_answers: Vec<DetailedAnswer>,
}

#[derive(Debug, Clone)]
pub struct ReportJob {
    /// `None` when the learner has no email on record.
    pub recipient: Option<String>,
    pub data: ReportData,
}

/// Turns report data into a binary document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, report: &ReportData) -> Result<Vec<u8>, ReportError>;
}

/// Delivers a rendered document to an address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, report: &ReportData, pdf: Vec<u8>) -> Result<(), ReportError>;
}

/// How a report task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered { attempts: u32 },
    NoRecipient { attempts: u32 },
    RenderFailed { attempts: u32 },
    SendFailed { attempts: u32 },
}

#[derive(Clone)]
pub struct ReportPipeline {
    renderer: Arc<dyn DocumentRenderer>,
    notifier: Arc<dyn Notifier>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ReportPipeline {
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        notifier: Arc<dyn Notifier>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            renderer,
            notifier,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Builds the HTTP renderer and SMTP notifier from configuration.
    /// Returns `Ok(None)` when either side is not configured.
    pub fn from_config(config: &ReportConfig) -> Result<Option<Self>, ReportError> {
        let (Some(renderer_url), Some(smtp)) = (&config.renderer_url, &config.smtp) else {
            return Ok(None);
        };

        let renderer_url = Url::parse(renderer_url).map_err(|e| {
            ReportError::Configuration(format!("invalid PDF_RENDERER_URL '{}': {}", renderer_url, e))
        })?;
        let renderer = HttpPdfRenderer::new(&renderer_url, config.render_timeout)?;
        let notifier = SmtpNotifier::new(smtp)?;

        Ok(Some(Self::new(
            Arc::new(renderer),
            Arc::new(notifier),
            config.max_attempts,
            config.retry_delay,
        )))
    }

    /// Runs the job on a detached task. The handle is only useful to tests;
    /// callers normally drop it.
    pub fn dispatch(&self, job: ReportJob) -> JoinHandle<ReportOutcome> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(job).await })
    }

    /// Rendering is retried up to `max_attempts` times with `retry_delay` in
    /// between. Sending happens once; a failed send is logged, not retried.
    pub async fn run(&self, job: ReportJob) -> ReportOutcome {
        let result_id = job.data.result_id;
        let mut attempt = 0;

        let pdf = loop {
            attempt += 1;
            tracing::info!(
                result_id,
                "Generating PDF report (attempt {}/{})",
                attempt,
                self.max_attempts
            );

            match self.renderer.render(&job.data).await {
                Ok(pdf) => break pdf,
                Err(e) => {
                    tracing::error!(result_id, "PDF generation failed (attempt {}): {}", attempt, e);
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            result_id,
                            "All PDF generation attempts failed, no report will be sent"
                        );
                        return ReportOutcome::RenderFailed { attempts: attempt };
                    }
                    tracing::warn!(result_id, "Retrying PDF generation in {:?}", self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        };

        let Some(recipient) = job.recipient.as_deref() else {
            tracing::info!(result_id, "No email address for user, skipping report email");
            return ReportOutcome::NoRecipient { attempts: attempt };
        };

        match self.notifier.send(recipient, &job.data, pdf).await {
            Ok(()) => {
                tracing::info!(result_id, "Report emailed to {}", recipient);
                ReportOutcome::Delivered { attempts: attempt }
            }
            Err(e) => {
                tracing::error!(result_id, "Report email failed: {}", e);
                ReportOutcome::SendFailed { attempts: attempt }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the pipeline and submission tests.

    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    /// Fails the first `failures` renders, then succeeds.
    pub struct FlakyRenderer {
        pub failures: u32,
        pub calls: AtomicU32,
    }

    impl FlakyRenderer {
        pub fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentRenderer for FlakyRenderer {
        async fn render(&self, _report: &ReportData) -> Result<Vec<u8>, ReportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ReportError::Render(format!("browser crashed on call {}", call)))
            } else {
                Ok(b"%PDF-1.7".to_vec())
            }
        }
    }

    /// Records every delivery; optionally fails all of them.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub fail: bool,
        pub sent: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient: &str, _report: &ReportData, pdf: Vec<u8>) -> Result<(), ReportError> {
            if self.fail {
                return Err(ReportError::Send("smtp unavailable".to_string()));
            }
            self.sent
                .lock()
                .expect("notifier lock poisoned")
                .push((recipient.to_string(), pdf.len()));
            Ok(())
        }
    }

    pub fn sample_data() -> ReportData {
        ReportData {
            result_id: 1,
            username: "asha".to_string(),
            overall_score: 3,
            total_questions: 25,
            subject_scores: SubjectScores {
                biology: 3,
                ..Default::default()
            },
            recommended_stream: Stream::Arts,
            date: chrono::Utc::now(),
            detailed_answers: Vec::new(),
        }
    }
}

// src/report/renderer.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::report::{DocumentRenderer, ReportData, ReportError, html};

/// Route of the Chromium HTML converter on a Gotenberg-compatible service.
const CONVERT_HTML_PATH: &str = "forms/chromium/convert/html";

/// Renders reports to PDF through a headless-browser conversion service.
///
/// The HTML is uploaded as `index.html`; the response body is the PDF.
pub struct HttpPdfRenderer {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPdfRenderer {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ReportError> {
        let endpoint = base_url
            .join(CONVERT_HTML_PATH)
            .map_err(|e| ReportError::Configuration(e.to_string()))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DocumentRenderer for HttpPdfRenderer {
    async fn render(&self, report: &ReportData) -> Result<Vec<u8>, ReportError> {
        let page = Part::text(html::render_report(report))
            .file_name("index.html")
            .mime_str("text/html")?;
        let form = Form::new()
            .part("files", page)
            .text("printBackground", "true")
            .text("preferCssPageSize", "false");

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Render(format!(
                "renderer returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let pdf = response.bytes().await?;
        tracing::debug!(
            result_id = report.result_id,
            bytes = pdf.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF rendered"
        );
        Ok(pdf.to_vec())
    }
}

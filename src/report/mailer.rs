// src/report/mailer.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    address::AddressError,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{
    config::SmtpConfig,
    report::{Notifier, ReportData, ReportError, html},
};

/// Mails the PDF report over SMTP (STARTTLS).
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, ReportError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ReportError::Configuration(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from: Mailbox = format!("{} <{}>", config.from_name, config.username)
            .parse()
            .map_err(|e: AddressError| ReportError::Configuration(e.to_string()))?;

        Ok(Self { transport, from })
    }
}

/// `CareerMate_Results_<username>_<unix millis>.pdf`
pub fn attachment_name(report: &ReportData) -> String {
    let username = if report.username.trim().is_empty() {
        "Student"
    } else {
        report.username.as_str()
    };
    let safe: String = username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!(
        "CareerMate_Results_{}_{}.pdf",
        safe,
        chrono::Utc::now().timestamp_millis()
    )
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &str, report: &ReportData, pdf: Vec<u8>) -> Result<(), ReportError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: AddressError| ReportError::Send(format!("bad recipient: {}", e)))?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| ReportError::Send(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(html::email_subject(report))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(html::render_email(report)))
                    .singlepart(Attachment::new(attachment_name(report)).body(pdf, pdf_type)),
            )
            .map_err(|e| ReportError::Send(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ReportError::Send(e.to_string()))?;

        Ok(())
    }
}

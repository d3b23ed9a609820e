// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

/// Default number of questions seeded per subject.
/// The stream decision table denominators are derived from it (4n, 3n, 2n).
pub const DEFAULT_QUESTIONS_PER_SUBJECT: i64 = 5;

/// Username recorded on results submitted without a session.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Which persistence backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// SMTP settings for mailing reports.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
}

/// Settings for the background report pipeline.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Base URL of the headless-browser conversion service, as configured.
    /// Parsed when the report pipeline is built.
    pub renderer_url: Option<String>,
    pub render_timeout: Duration,
    pub smtp: Option<SmtpConfig>,
    /// Total render attempts, including the first one.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            renderer_url: None,
            render_timeout: Duration::from_secs(30),
            smtp: None,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub store_backend: StoreBackend,
    pub questions_per_subject: i64,
    pub report: ReportConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Postgres,
        };

        let database_url = match store_backend {
            StoreBackend::Postgres => env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            StoreBackend::Memory => env::var("DATABASE_URL").unwrap_or_default(),
        };

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let questions_per_subject =
            parse_or("QUESTIONS_PER_SUBJECT", DEFAULT_QUESTIONS_PER_SUBJECT).max(1);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
            store_backend,
            questions_per_subject,
            report: ReportConfig::from_env(),
        }
    }
}

impl ReportConfig {
    fn from_env() -> Self {
        let defaults = Self::default();

        let renderer_url = env::var("PDF_RENDERER_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty());

        let smtp = match (
            env::var("SMTP_HOST"),
            env::var("SMTP_USERNAME"),
            env::var("SMTP_PASSWORD"),
        ) {
            (Ok(host), Ok(username), Ok(password)) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587),
                username,
                password,
                from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "CareerMate".to_string()),
            }),
            _ => None,
        };

        Self {
            renderer_url,
            render_timeout: Duration::from_secs(parse_or(
                "PDF_RENDER_TIMEOUT_SECS",
                defaults.render_timeout.as_secs(),
            )),
            smtp,
            max_attempts: parse_or("REPORT_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            retry_delay: Duration::from_millis(parse_or(
                "REPORT_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// src/config.rs

use dotenvy::dotenv;
use std::env;
use url::Url;

/// Number of questions in a full mock exam.
pub const FULL_EXAM_QUESTION_COUNT: i64 = 40;

/// Default and upper bound for personalized test sizes.
pub const DEFAULT_TEST_QUESTION_COUNT: i64 = 10;
pub const MAX_TEST_QUESTION_COUNT: i64 = 40;

/// Accuracy below this marks a question as "to improve".
pub const LOW_ACCURACY_THRESHOLD: f64 = 0.7;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Token lifetimes, in hours.
pub const VERIFY_TOKEN_TTL_HOURS: i64 = 24;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;
pub const EMAIL_CHANGE_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Public origin used for links in emails and the OAuth redirect.
    pub base_url: Url,
    pub rust_log: String,
    pub cookie_secure: bool,

    /// SMTP relay; when unset, outbound mail is logged instead of sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    /// Check new passwords against the Pwned Passwords range API.
    pub breach_check_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000/".to_string());
        let base_url = Url::parse(&base_url).expect("BASE_URL must be a valid URL");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let smtp_host = env::var("SMTP_HOST").ok();
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "ExamTrainer <no-reply@localhost>".to_string());

        let google_client_id = env::var("GOOGLE_CLIENT_ID").ok();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").ok();

        let breach_check_enabled = env::var("BREACH_CHECK_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Self {
            database_url,
            base_url,
            rust_log,
            cookie_secure,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            mail_from,
            google_client_id,
            google_client_secret,
            breach_check_enabled,
        }
    }
}
